use crate::geo::fence::MonitoringArea;
use crate::math::GeoPoint;
use crate::prelude::{CoreError, CoreResult};
use serde_json::Value;
use std::fs;
use std::path::Path;

/// Loads monitoring areas from a GeoJSON `FeatureCollection` or a
/// `{"polygons": [[[lat, lon], ...], ...]}` document.
pub fn load_areas<P: AsRef<Path>>(path: P) -> CoreResult<Vec<MonitoringArea>> {
    let path_ref = path.as_ref();
    let contents = fs::read_to_string(path_ref).map_err(|err| {
        CoreError::Configuration(format!("reading areas {}: {}", path_ref.display(), err))
    })?;
    parse_areas(&contents)
}

pub fn parse_areas(contents: &str) -> CoreResult<Vec<MonitoringArea>> {
    let document: Value = serde_json::from_str(contents)
        .map_err(|err| CoreError::Configuration(format!("areas are not valid JSON: {}", err)))?;

    if document.get("type").and_then(Value::as_str) == Some("FeatureCollection") {
        return parse_feature_collection(&document);
    }
    if let Some(polygons) = document.get("polygons").and_then(Value::as_array) {
        return polygons
            .iter()
            .enumerate()
            .map(|(idx, polygon)| {
                let rings = parse_rings(polygon, CoordOrder::LatLon)?;
                build_area(format!("area-{}", idx + 1), rings)
            })
            .collect();
    }
    Err(CoreError::Configuration(
        "areas document is neither a FeatureCollection nor a polygons list".into(),
    ))
}

#[derive(Clone, Copy)]
enum CoordOrder {
    LonLat,
    LatLon,
}

fn parse_feature_collection(document: &Value) -> CoreResult<Vec<MonitoringArea>> {
    let features = document
        .get("features")
        .and_then(Value::as_array)
        .ok_or_else(|| CoreError::Configuration("FeatureCollection without features".into()))?;

    let mut areas = Vec::new();
    for (idx, feature) in features.iter().enumerate() {
        let name = feature
            .pointer("/properties/name")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| format!("area-{}", idx + 1));
        let geometry = match feature.get("geometry") {
            Some(geometry) if !geometry.is_null() => geometry,
            _ => continue,
        };
        let coordinates = geometry.get("coordinates").unwrap_or(&Value::Null);
        match geometry.get("type").and_then(Value::as_str) {
            Some("Polygon") => {
                let rings = parse_rings(coordinates, CoordOrder::LonLat)?;
                areas.push(build_area(name, rings)?);
            }
            Some("MultiPolygon") => {
                let members = coordinates.as_array().ok_or_else(|| {
                    CoreError::Configuration(format!("area {}: malformed MultiPolygon", name))
                })?;
                for (k, member) in members.iter().enumerate() {
                    let rings = parse_rings(member, CoordOrder::LonLat)?;
                    areas.push(build_area(format!("{}#{}", name, k + 1), rings)?);
                }
            }
            _ => continue,
        }
    }
    Ok(areas)
}

fn parse_rings(value: &Value, order: CoordOrder) -> CoreResult<Vec<Vec<GeoPoint>>> {
    let rings = value
        .as_array()
        .ok_or_else(|| CoreError::Configuration("polygon rings must be an array".into()))?;
    rings
        .iter()
        .map(|ring| -> CoreResult<Vec<GeoPoint>> {
            ring.as_array()
                .ok_or_else(|| CoreError::Configuration("ring must be an array".into()))?
                .iter()
                .map(|coord| parse_coord(coord, order))
                .collect()
        })
        .collect()
}

fn parse_coord(value: &Value, order: CoordOrder) -> CoreResult<GeoPoint> {
    let pair = value.as_array().filter(|pair| pair.len() >= 2);
    let (a, b) = match pair.map(|p| (p[0].as_f64(), p[1].as_f64())) {
        Some((Some(a), Some(b))) => (a, b),
        _ => {
            return Err(CoreError::Configuration(format!(
                "invalid coordinate {}",
                value
            )))
        }
    };
    Ok(match order {
        CoordOrder::LonLat => GeoPoint::new(b, a),
        CoordOrder::LatLon => GeoPoint::new(a, b),
    })
}

fn build_area(name: String, mut rings: Vec<Vec<GeoPoint>>) -> CoreResult<MonitoringArea> {
    if rings.is_empty() {
        return Err(CoreError::Configuration(format!("area {}: no rings", name)));
    }
    let outer = rings.remove(0);
    MonitoringArea::new(name, outer, rings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const GEOJSON: &str = r#"{
        "type": "FeatureCollection",
        "features": [
            {"type": "Feature", "properties": {"name": "po-valley"},
             "geometry": {"type": "Polygon",
                          "coordinates": [[[8.0, 44.0], [10.0, 44.0], [10.0, 46.0], [8.0, 46.0], [8.0, 44.0]]]}},
            {"type": "Feature", "properties": {},
             "geometry": {"type": "MultiPolygon",
                          "coordinates": [[[[12.0, 41.0], [13.0, 41.0], [13.0, 42.0]]],
                                          [[[14.0, 40.0], [15.0, 40.0], [15.0, 41.0]]]]}}
        ]
    }"#;

    #[test]
    fn geojson_uses_lon_lat_order() {
        let areas = parse_areas(GEOJSON).unwrap();
        assert_eq!(areas.len(), 3);
        assert_eq!(areas[0].name(), "po-valley");
        assert!(areas[0].contains(&GeoPoint::new(45.0, 9.0)));
        assert_eq!(areas[1].name(), "area-2#1");
        assert_eq!(areas[2].name(), "area-2#2");
    }

    #[test]
    fn polygons_document_uses_lat_lon_order() {
        let doc = r#"{"polygons": [[[[44.0, 8.0], [44.0, 10.0], [46.0, 10.0], [46.0, 8.0]]]]}"#;
        let areas = parse_areas(doc).unwrap();
        assert_eq!(areas.len(), 1);
        assert!(areas[0].contains(&GeoPoint::new(45.0, 9.0)));
    }

    #[test]
    fn degenerate_polygon_is_a_configuration_error() {
        let doc = r#"{"polygons": [[[[44.0, 8.0], [44.0, 10.0]]]]}"#;
        assert!(matches!(parse_areas(doc), Err(CoreError::Configuration(_))));
    }

    #[test]
    fn load_reads_from_disk() {
        let mut temp = NamedTempFile::new().unwrap();
        temp.write_all(GEOJSON.as_bytes()).unwrap();
        let path = temp.into_temp_path();
        assert_eq!(load_areas(&path).unwrap().len(), 3);
    }
}
