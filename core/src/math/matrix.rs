use ndarray::{Array1, Array2, ArrayView1, ArrayView2};

pub struct MatrixHelper;

impl MatrixHelper {
    pub fn multiply(lhs: ArrayView2<f64>, rhs: ArrayView2<f64>) -> Array2<f64> {
        lhs.dot(&rhs)
    }

    /// Least-squares normal equations `(AᵀA, Aᵀb)` for a design matrix `A`.
    pub fn normal_equations(
        design: ArrayView2<f64>,
        rhs: ArrayView1<f64>,
    ) -> (Array2<f64>, Array1<f64>) {
        let ata = Self::multiply(design.t(), design);
        let atb = design.t().dot(&rhs);
        (ata, atb)
    }

    /// Solves a 3x3 system with Cramer's rule; `None` when near-singular.
    pub fn solve3(a: &Array2<f64>, b: &Array1<f64>) -> Option<[f64; 3]> {
        if a.shape() != [3, 3] || b.len() != 3 {
            return None;
        }
        let det = det3(a, None, b);
        let scale = a.iter().fold(0.0_f64, |acc, v| acc.max(v.abs()));
        if !det.is_finite() || det.abs() <= f64::EPSILON * scale.powi(3).max(f64::MIN_POSITIVE) {
            return None;
        }
        Some([
            det3(a, Some(0), b) / det,
            det3(a, Some(1), b) / det,
            det3(a, Some(2), b) / det,
        ])
    }
}

/// Determinant of `a`, optionally with column `replace` swapped for `b`.
fn det3(a: &Array2<f64>, replace: Option<usize>, b: &Array1<f64>) -> f64 {
    let m = |r: usize, c: usize| {
        if Some(c) == replace {
            b[r]
        } else {
            a[[r, c]]
        }
    };
    m(0, 0) * (m(1, 1) * m(2, 2) - m(1, 2) * m(2, 1))
        - m(0, 1) * (m(1, 0) * m(2, 2) - m(1, 2) * m(2, 0))
        + m(0, 2) * (m(1, 0) * m(2, 1) - m(1, 1) * m(2, 0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn solve3_recovers_known_solution() {
        let a = array![[2.0, 1.0, 0.0], [1.0, 3.0, 1.0], [0.0, 1.0, 4.0]];
        let x = array![1.0, -2.0, 3.0];
        let b = a.dot(&x);
        let solved = MatrixHelper::solve3(&a, &b).unwrap();
        for (got, want) in solved.iter().zip(x.iter()) {
            assert!((got - want).abs() < 1e-9);
        }
    }

    #[test]
    fn solve3_rejects_singular_matrix() {
        let a = array![[1.0, 2.0, 3.0], [2.0, 4.0, 6.0], [0.0, 1.0, 1.0]];
        assert!(MatrixHelper::solve3(&a, &array![1.0, 2.0, 3.0]).is_none());
    }
}
