use dem_common::structures::Point2D;

/// Vehicle pose in the world frame: yaw `ang` plus planar translation `shv`
/// (spec §3, `TRANSINFO` in the original C++ source).
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct Pose {
    pub ang: f64,
    pub shv: Point2D,
}

impl Pose {
    pub fn new(ang: f64, shv: Point2D) -> Pose {
        Pose { ang, shv }
    }

    /// The two rotations used by the GlobalDEM predictor (§4.2):
    /// `R1 = R(prev.ang - cur.ang)` applied to source cell positions, and
    /// `R2 = R(-cur.ang)` applied to the translation delta.
    pub fn prediction_rotations(prev: Pose, cur: Pose) -> (f64, f64) {
        (prev.ang - cur.ang, -cur.ang)
    }

    /// `SHV = prev.shv - cur.shv` (§4.2 step 1).
    pub fn shift_delta(prev: Pose, cur: Pose) -> Point2D {
        prev.shv - cur.shv
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_delta_rotations_are_zero() {
        let p = Pose::new(0.7, Point2D::new(1.0, 2.0));
        let (r1, r2) = Pose::prediction_rotations(p, p);
        assert_eq!(r1, 0.0);
        assert!((r2 + 0.7).abs() < 1e-12);
    }
}
