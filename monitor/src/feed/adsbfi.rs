use crate::feed::model::AdsbResponse;
use flightcore::prelude::unix_now;
use flightcore::{Feed, FetchError, StateVector};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::future::Future;
use std::time::Duration;

/// Circular upstream query region.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tile {
    pub lat: f64,
    pub lon: f64,
    pub radius_nm: u32,
    #[serde(default)]
    pub name: Option<String>,
}

impl Tile {
    fn new(name: &str, lat: f64, lon: f64, radius_nm: u32) -> Self {
        Self {
            lat,
            lon,
            radius_nm,
            name: Some(name.to_string()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedConfig {
    pub base_url: String,
    pub tiles: Vec<Tile>,
    /// Also poll the military endpoint; its aircraft are forced military.
    pub military: bool,
    pub request_timeout_s: f64,
    pub user_agent: String,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            base_url: "https://opendata.adsb.fi/api/v2".to_string(),
            tiles: vec![
                Tile::new("milano", 45.5, 9.2, 250),
                Tile::new("bologna", 44.5, 11.3, 200),
                Tile::new("firenze", 43.8, 11.3, 200),
                Tile::new("roma", 41.9, 12.5, 200),
                Tile::new("napoli", 40.8, 14.3, 200),
                Tile::new("sardegna", 39.2, 9.1, 250),
                Tile::new("messina", 38.1, 15.6, 250),
                Tile::new("palermo", 37.5, 13.4, 200),
            ],
            military: true,
            request_timeout_s: 15.0,
            user_agent: concat!("airspace-monitor/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FeedQuery {
    Tile(Tile),
    Military,
}

impl fmt::Display for FeedQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FeedQuery::Tile(tile) => match &tile.name {
                Some(name) => write!(f, "tile {}", name),
                None => write!(f, "tile {:.2},{:.2}/{}nm", tile.lat, tile.lon, tile.radius_nm),
            },
            FeedQuery::Military => write!(f, "military endpoint"),
        }
    }
}

/// adsb.fi open-data client.
pub struct AdsbfiFeed {
    client: reqwest::Client,
    config: FeedConfig,
}

impl AdsbfiFeed {
    pub fn new(config: FeedConfig) -> anyhow::Result<Self> {
        let timeout = Duration::try_from_secs_f64(config.request_timeout_s)
            .map_err(|_| anyhow::anyhow!("invalid feed request timeout {}", config.request_timeout_s))?;
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(config.user_agent.clone())
            .build()?;
        Ok(Self { client, config })
    }

    pub fn url(&self, query: &FeedQuery) -> String {
        let base = self.config.base_url.trim_end_matches('/');
        match query {
            FeedQuery::Tile(tile) => format!(
                "{}/lat/{}/lon/{}/dist/{}",
                base, tile.lat, tile.lon, tile.radius_nm
            ),
            FeedQuery::Military => format!("{}/mil", base),
        }
    }
}

impl Feed for AdsbfiFeed {
    type Query = FeedQuery;

    fn queries(&self) -> Vec<FeedQuery> {
        let mut queries: Vec<FeedQuery> = self.config.tiles.iter().cloned().map(FeedQuery::Tile).collect();
        if self.config.military {
            queries.push(FeedQuery::Military);
        }
        queries
    }

    fn fetch(
        &self,
        query: &FeedQuery,
    ) -> impl Future<Output = Result<Vec<StateVector>, FetchError>> + Send {
        let client = self.client.clone();
        let url = self.url(query);
        let force_military = matches!(query, FeedQuery::Military);
        async move {
            let response = client
                .get(&url)
                .send()
                .await
                .map_err(|e| FetchError::Http(e.to_string()))?;
            let status = response.status();
            if !status.is_success() {
                return Err(FetchError::Status(status.as_u16()));
            }
            let body = response
                .json::<AdsbResponse>()
                .await
                .map_err(|e| FetchError::Decode(e.to_string()))?;
            Ok(body.into_state_vectors(unix_now(), force_military))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn urls_follow_the_v2_layout() {
        let feed = AdsbfiFeed::new(FeedConfig {
            base_url: "https://example.test/api/v2/".into(),
            ..FeedConfig::default()
        })
        .unwrap();
        let tile = FeedQuery::Tile(Tile {
            lat: 45.5,
            lon: 9.2,
            radius_nm: 250,
            name: None,
        });
        assert_eq!(feed.url(&tile), "https://example.test/api/v2/lat/45.5/lon/9.2/dist/250");
        assert_eq!(feed.url(&FeedQuery::Military), "https://example.test/api/v2/mil");
    }

    #[test]
    fn military_endpoint_is_optional() {
        let feed = AdsbfiFeed::new(FeedConfig {
            military: false,
            ..FeedConfig::default()
        })
        .unwrap();
        let queries = feed.queries();
        assert_eq!(queries.len(), 8);
        assert!(!queries.contains(&FeedQuery::Military));
        assert_eq!(queries[0].to_string(), "tile milano");
    }
}
