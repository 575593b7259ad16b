pub struct StatsHelper;

impl StatsHelper {
    pub fn rms(samples: &[f64]) -> f64 {
        if samples.is_empty() {
            return 0.0;
        }
        let sum_sq: f64 = samples.iter().map(|&v| v * v).sum();
        (sum_sq / samples.len() as f64).sqrt()
    }

    pub fn mean(samples: &[f64]) -> f64 {
        if samples.is_empty() {
            return 0.0;
        }
        samples.iter().sum::<f64>() / samples.len() as f64
    }

    pub fn std_dev(samples: &[f64]) -> f64 {
        if samples.len() < 2 {
            return 0.0;
        }
        let mean = Self::mean(samples);
        let var = samples.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / samples.len() as f64;
        var.sqrt()
    }

    /// Standard deviation over mean; infinite for a zero mean.
    pub fn coefficient_of_variation(samples: &[f64]) -> f64 {
        let mean = Self::mean(samples);
        if mean == 0.0 {
            return f64::INFINITY;
        }
        Self::std_dev(samples) / mean.abs()
    }

    /// Mean direction of undirected axes (degrees, modulo 180).
    pub fn axial_mean_deg(axes: &[f64]) -> Option<f64> {
        if axes.is_empty() {
            return None;
        }
        let (sin, cos) = axes.iter().fold((0.0, 0.0), |(s, c), axis| {
            let doubled = (2.0 * axis).to_radians();
            (s + doubled.sin(), c + doubled.cos())
        });
        if sin == 0.0 && cos == 0.0 {
            return None;
        }
        Some((sin.atan2(cos).to_degrees() / 2.0).rem_euclid(180.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rms_zero_sequence_yields_zero() {
        assert_eq!(StatsHelper::rms(&[]), 0.0);
        assert_eq!(StatsHelper::rms(&[0.0, 0.0]), 0.0);
    }

    #[test]
    fn rms_handles_single_value() {
        assert_eq!(StatsHelper::rms(&[4.0]), 4.0);
    }

    #[test]
    fn constant_series_has_zero_variation() {
        assert_eq!(StatsHelper::coefficient_of_variation(&[2.0, 2.0, 2.0]), 0.0);
        assert!(StatsHelper::coefficient_of_variation(&[0.0, 0.0]).is_infinite());
    }

    #[test]
    fn axial_mean_wraps_around_north() {
        let mean = StatsHelper::axial_mean_deg(&[178.0, 2.0]).unwrap();
        assert!(mean < 0.5 || mean > 179.5);
    }
}
