use crate::math::matrix::MatrixHelper;
use crate::math::stats::StatsHelper;
use ndarray::{Array1, Array2};

/// Algebraic (Kåsa) least-squares circle fit over planar points.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CircleFit {
    pub center_x: f64,
    pub center_y: f64,
    pub radius: f64,
    /// RMS of the radial distance error, same unit as the radius.
    pub rms_residual: f64,
}

impl CircleFit {
    pub fn fit(points: &[(f64, f64)]) -> Option<Self> {
        if points.len() < 3 {
            return None;
        }
        let n = points.len() as f64;
        let mean_x = points.iter().map(|p| p.0).sum::<f64>() / n;
        let mean_y = points.iter().map(|p| p.1).sum::<f64>() / n;

        let mut design = Array2::<f64>::zeros((points.len(), 3));
        let mut rhs = Array1::<f64>::zeros(points.len());
        for (row, &(x, y)) in points.iter().enumerate() {
            let u = x - mean_x;
            let v = y - mean_y;
            design[[row, 0]] = u;
            design[[row, 1]] = v;
            design[[row, 2]] = 1.0;
            rhs[row] = -(u * u + v * v);
        }

        let (ata, atb) = MatrixHelper::normal_equations(design.view(), rhs.view());
        let [d, e, f] = MatrixHelper::solve3(&ata, &atb)?;
        let cu = -d / 2.0;
        let cv = -e / 2.0;
        let radius_sq = cu * cu + cv * cv - f;
        if !radius_sq.is_finite() || radius_sq <= 0.0 {
            return None;
        }
        let radius = radius_sq.sqrt();

        let center_x = cu + mean_x;
        let center_y = cv + mean_y;
        let errors: Vec<f64> = points
            .iter()
            .map(|&(x, y)| ((x - center_x).hypot(y - center_y)) - radius)
            .collect();

        Some(Self {
            center_x,
            center_y,
            radius,
            rms_residual: StatsHelper::rms(&errors),
        })
    }

    pub fn relative_residual(&self) -> f64 {
        self.rms_residual / self.radius
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fits_exact_circle() {
        let points: Vec<(f64, f64)> = (0..16)
            .map(|i| {
                let a = i as f64 / 16.0 * std::f64::consts::TAU;
                (3.0 + 2.0 * a.cos(), -1.0 + 2.0 * a.sin())
            })
            .collect();
        let fit = CircleFit::fit(&points).unwrap();
        assert!((fit.radius - 2.0).abs() < 1e-9);
        assert!((fit.center_x - 3.0).abs() < 1e-9);
        assert!((fit.center_y + 1.0).abs() < 1e-9);
        assert!(fit.rms_residual < 1e-9);
    }

    #[test]
    fn collinear_points_do_not_fit() {
        let points = [(0.0, 0.0), (1.0, 0.0), (2.0, 0.0), (3.0, 0.0)];
        assert!(CircleFit::fit(&points).is_none());
    }
}
