use dem_common::structures::{Point2D, SaturatingCount};

use crate::config::PipelineConfig;
use crate::dem::Dem;
use crate::labels::CoarseLabel;
use crate::pose::Pose;

const DECAY: f64 = 0.92;
const MIN_LPR: f64 = 0.2;
const AGREE_BOOST: f64 = 1.2;
const DISAGREE_PENALTY: f64 = 0.8;

/// Re-projects the previous-frame global DEM into the current vehicle
/// frame, with a per-step confidence decay (spec §4.2).
pub struct GlobalDemPredictor;

impl GlobalDemPredictor {
    /// `temp` is the scratch DEM that holds the previous global state for
    /// the duration of this call; it is zeroed on return, matching spec
    /// §3's lifecycle note for the "temp" DEM.
    pub fn predict(glo: &mut Dem, temp: &mut Dem, cur_pose: Pose, cfg: &PipelineConfig) {
        temp.copy_all_from(glo);
        glo.zero_for_frame();
        glo.trans = cur_pose;

        if !temp.dataon {
            glo.dataon = false;
            temp.release();
            return;
        }

        glo.dataon = true;

        let prev_pose = temp.trans;
        let (r1, r2) = Pose::prediction_rotations(prev_pose, cur_pose);
        let shv = Pose::shift_delta(prev_pose, cur_pose);

        let (width, length) = (temp.width, temp.length);
        let (half_w, half_l) = (width / 2, length / 2);

        for y in 0..length {
            for x in 0..width {
                let lab = temp.lab(y, x);
                let lpr = temp.lpr(y, x);
                if lab == CoarseLabel::Unknown || lpr < MIN_LPR {
                    continue;
                }

                // Point2D::rotated is counter-clockwise; yaw in this vehicle
                // frame (x right, y forward) increases clockwise, so the
                // spec's R(theta) is applied here as rotated(-theta).
                let mut p = Point2D::new((x - half_w) as f64 * cfg.pix_siz, (y - half_l) as f64 * cfg.pix_siz);
                p = p.rotated(-r1);
                let shv_rot = shv.rotated(-r2);
                p = p.shifted(shv_rot);

                let xx = (p.x / cfg.pix_siz).round() as isize + half_w;
                let yy = (p.y / cfg.pix_siz).round() as isize + half_l;
                if xx < 0 || yy < 0 || xx >= width || yy >= length {
                    continue;
                }

                let decayed = lpr * DECAY;
                if decayed < MIN_LPR {
                    continue;
                }

                let target_lab = glo.lab(yy, xx);
                if target_lab == CoarseLabel::Unknown {
                    glo.copy_cell_from(yy, xx, temp, y, x);
                    glo.set_lpr(yy, xx, decayed);
                } else if glo.lpr(yy, xx) < decayed {
                    // overwrite numeric fields unconditionally
                    glo.set_demg(yy, xx, temp.demg(y, x));
                    glo.set_demgnum(yy, xx, SaturatingCount::new(temp.demgnum(y, x)));
                    glo.set_demhmin(yy, xx, temp.demhmin(y, x));
                    glo.set_demhmax(yy, xx, temp.demhmax(y, x));
                    glo.set_demhnum(yy, xx, SaturatingCount::new(temp.demhnum(y, x)));

                    if target_lab == lab {
                        glo.set_lpr(yy, xx, (decayed * AGREE_BOOST).min(1.0));
                    } else {
                        glo.set_lab(yy, xx, lab);
                        glo.set_lpr(yy, xx, (decayed * DISAGREE_PENALTY).min(1.0));
                    }
                }
            }
        }

        temp.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn populated_dem(width: isize, length: isize) -> Dem {
        let mut dem = Dem::new(width, length);
        dem.zero_for_frame();
        dem.dataon = true;
        dem
    }

    /// Predictor identity law (spec §8): with zero pose delta, every field
    /// is numerically unchanged except `lpr`, uniformly scaled by 0.92.
    #[test]
    fn test_zero_delta_only_decays_confidence() {
        let cfg = PipelineConfig::new();
        let (w, l) = (cfg.width_cells(), cfg.length_cells());
        let mut glo = populated_dem(w, l);
        let (hw, hl) = (w / 2, l / 2);
        glo.set_lab(hl, hw, CoarseLabel::Traversable);
        glo.set_lpr(hl, hw, 0.8);
        glo.set_demg(hl, hw, 1.23);
        glo.trans = Pose::default();

        let mut temp = Dem::new(w, l);
        GlobalDemPredictor::predict(&mut glo, &mut temp, Pose::default(), &cfg);

        assert_eq!(glo.lab(hl, hw), CoarseLabel::Traversable);
        assert_eq!(glo.demg(hl, hw), 1.23);
        assert!((glo.lpr(hl, hw) - 0.8 * 0.92).abs() < 1e-9);
    }

    /// Boundary scenario 3 (spec §8): a 90-degree yaw delta with zero
    /// translation moves a cell from (W/2+10, L/2) to (W/2, L/2+10).
    #[test]
    fn test_90_degree_yaw_rotates_cell_position() {
        let mut cfg = PipelineConfig::new();
        cfg.wid_siz = 10.0;
        cfg.len_siz = 10.0;
        cfg.pix_siz = 0.5;
        let (w, l) = (cfg.width_cells(), cfg.length_cells());
        let (hw, hl) = (w / 2, l / 2);

        let mut glo = populated_dem(w, l);
        glo.set_lab(hl, hw + 10, CoarseLabel::Traversable);
        glo.set_lpr(hl, hw + 10, 0.9);
        glo.trans = Pose::new(0.0, Point2D::new(0.0, 0.0));

        let mut temp = Dem::new(w, l);
        let cur_pose = Pose::new(std::f64::consts::FRAC_PI_2, Point2D::new(0.0, 0.0));
        GlobalDemPredictor::predict(&mut glo, &mut temp, cur_pose, &cfg);

        assert_eq!(glo.lab(hl + 10, hw), CoarseLabel::Traversable);
        assert!((glo.lpr(hl + 10, hw) - 0.9 * 0.92).abs() < 1e-6);
    }

    #[test]
    fn test_no_prior_data_is_a_noop() {
        let cfg = PipelineConfig::new();
        let (w, l) = (cfg.width_cells(), cfg.length_cells());
        let mut glo = Dem::new(w, l);
        let mut temp = Dem::new(w, l);
        GlobalDemPredictor::predict(&mut glo, &mut temp, Pose::default(), &cfg);
        assert!(!glo.dataon);
    }
}
