use nalgebra::{DMatrix, DVector};

/// Least-squares plane `z = a*x + b*y + c` fit to a set of ground samples,
/// grounded on `whitebox_common::structures::PolynomialRegression2D`'s use
/// of `nalgebra`'s SVD solver for the same kind of normal-equations problem.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct PlaneFit {
    pub a: f64,
    pub b: f64,
    pub c: f64,
}

impl PlaneFit {
    /// Returns `None` on a degenerate or near-singular sample set (too few
    /// points, or points that don't constrain one of the three unknowns)
    /// instead of panicking, so callers can fall back to `FLATGROUND`
    /// rather than propagate a numerical failure (spec §9).
    pub fn fit(samples: &[(f64, f64, f64)]) -> Option<PlaneFit> {
        let n = samples.len();
        if n < 3 {
            return None;
        }

        let mut rows = Vec::with_capacity(n * 3);
        let mut z = Vec::with_capacity(n);
        for &(x, y, zz) in samples {
            rows.push(x);
            rows.push(y);
            rows.push(1.0);
            z.push(zz);
        }

        let design = DMatrix::from_row_slice(n, 3, &rows);
        let target = DVector::from_row_slice(&z);
        let svd = design.svd(true, true);
        let coeffs = svd.solve(&target, f64::EPSILON).ok()?;

        Some(PlaneFit {
            a: coeffs[0],
            b: coeffs[1],
            c: coeffs[2],
        })
    }

    /// Recovers roll `ax = asin(-n_y)` and pitch `ay =
    /// atan2(n_x/cos(ax), n_z/cos(ax))` from the plane's unit normal
    /// (spec §4.5).
    pub fn roll_pitch(&self) -> (f64, f64) {
        let norm = (self.a * self.a + self.b * self.b + 1.0).sqrt();
        let (nx, ny, nz) = (-self.a / norm, -self.b / norm, 1.0 / norm);
        let ax = (-ny).asin();
        let cos_ax = ax.cos();
        let ay = if cos_ax.abs() > f64::EPSILON {
            (nx / cos_ax).atan2(nz / cos_ax)
        } else {
            0.0
        };
        (ax, ay)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fits_exact_plane() {
        let samples: Vec<(f64, f64, f64)> = (0..20)
            .map(|i| {
                let x = (i % 5) as f64;
                let y = (i / 5) as f64;
                (x, y, 0.1 * x + 0.2 * y + 1.0)
            })
            .collect();
        let fit = PlaneFit::fit(&samples).unwrap();
        assert!((fit.a - 0.1).abs() < 1e-9);
        assert!((fit.b - 0.2).abs() < 1e-9);
        assert!((fit.c - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_flat_plane_has_zero_tilt() {
        let samples: Vec<(f64, f64, f64)> = (0..10).map(|i| (i as f64, 0.0, 2.0)).collect();
        let fit = PlaneFit::fit(&samples).unwrap();
        let (ax, ay) = fit.roll_pitch();
        assert!(ax.abs() < 1e-9);
        assert!(ay.abs() < 1e-9);
    }

    #[test]
    fn test_too_few_samples_returns_none() {
        assert!(PlaneFit::fit(&[(0.0, 0.0, 0.0), (1.0, 0.0, 0.0)]).is_none());
    }
}
