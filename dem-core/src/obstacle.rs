use crate::config::PipelineConfig;
use crate::dem::Dem;
use crate::labels::{CoarseLabel, FineLabel};

const LOOKAHEAD_ROWS: isize = 10;
const MIN_GAP_M: f64 = 2.0;

/// Classifies non-traversable runs ahead of the vehicle as positive or
/// negative obstacles relative to the centerline's road height, and infers
/// negative obstacles from unexpectedly long blind gaps between
/// traversable cells (spec §4.6). Per-column scans are independent of each
/// other, but each column's scan is itself sequential (a run's
/// classification advances the cursor past it), so this stays a plain
/// per-column loop rather than a parallel pass.
pub struct ObstacleSublabeler;

impl ObstacleSublabeler {
    pub fn sublabel(dem: &mut Dem, cfg: &PipelineConfig) {
        let (width, length) = (dem.width, dem.length);
        let (half_w, half_l) = (width / 2, length / 2);

        for x in 0..width {
            let mut y = 0;
            while y < length {
                let (dx, dy) = (x - half_w, y - half_l);
                let dist = ((dx * dx + dy * dy) as f64).sqrt() * cfg.pix_siz;

                if dem.lab(y, x) != CoarseLabel::Traversable || dist <= cfg.near_vehicle_dis {
                    y += 1;
                    continue;
                }

                match Self::find_next(dem, x, y, length) {
                    Some((y0, CoarseLabel::NonTraversable)) => {
                        y = Self::label_obstacle_run(dem, x, y0, length, cfg);
                    }
                    Some((y0, CoarseLabel::Traversable)) => {
                        Self::label_blind_gap(dem, x, y, y0, cfg);
                        y = y0;
                    }
                    _ => y += 1,
                }
            }
        }
    }

    fn find_next(dem: &Dem, x: isize, y: isize, length: isize) -> Option<(isize, CoarseLabel)> {
        for ahead in 1..=LOOKAHEAD_ROWS {
            let yy = y + ahead;
            if yy >= length {
                break;
            }
            let lab = dem.lab(yy, x);
            if lab == CoarseLabel::NonTraversable || lab == CoarseLabel::Traversable {
                return Some((yy, lab));
            }
        }
        None
    }

    /// Labels the consecutive NONTRAVERSABLE run starting at `y0`, stopping
    /// at the first cell that is no longer NONTRAVERSABLE. Returns that
    /// row so the caller can resume scanning from it.
    fn label_obstacle_run(dem: &mut Dem, x: isize, y0: isize, length: isize, cfg: &PipelineConfig) -> isize {
        let mut yy = y0;
        while yy < length && dem.lab(yy, x) == CoarseLabel::NonTraversable {
            let road_h = dem.centerline(yy).h;
            let hmin = dem.demhmin(yy, x);
            let hmax = dem.demhmax(yy, x);
            if hmin < road_h + cfg.vehicle_height || hmax > road_h + cfg.pos_obs_min_height {
                dem.set_sublab(yy, x, FineLabel::PositiveObstacle);
            } else if hmax < road_h - cfg.pos_obs_min_height {
                dem.set_sublab(yy, x, FineLabel::NegativeObstacle);
            }
            yy += 1;
        }
        yy
    }

    /// If the UNKNOWN gap between two TRAVERSABLE cells is longer than the
    /// expected inter-ring spacing, the sensor would have seen ground in
    /// between had there been any — infer a drop-off.
    fn label_blind_gap(dem: &mut Dem, x: isize, y: isize, y0: isize, cfg: &PipelineConfig) {
        let gap_m = (y0 - y) as f64 * cfg.pix_siz;
        let threshold = MIN_GAP_M.max(dem.centerline(y0).dl);
        if gap_m > threshold {
            for yy in (y + 1)..y0 {
                if dem.lab(yy, x) == CoarseLabel::Unknown {
                    dem.set_sublab(yy, x, FineLabel::NegativeObstacle);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dem::CenterlineRow;

    fn cfg_with_ring(near_vehicle_dis: f64) -> PipelineConfig {
        let mut cfg = PipelineConfig::new();
        cfg.wid_siz = 4.0;
        cfg.len_siz = 50.0;
        cfg.pix_siz = 1.0;
        cfg.near_vehicle_dis = near_vehicle_dis;
        cfg.vehicle_height = 2.0;
        cfg.pos_obs_min_height = 0.3;
        cfg
    }

    /// Boundary scenario 4 (spec §8): a non-traversable cell 1.0m above the
    /// road surface classifies as a positive obstacle.
    #[test]
    fn test_positive_obstacle_above_clearance() {
        let cfg = cfg_with_ring(1.0);
        let mut dem = Dem::new(cfg.width_cells(), cfg.length_cells());
        dem.zero_for_frame();
        let hw = dem.width / 2;
        let hl = dem.length / 2;
        for y in 0..dem.length {
            dem.set_centerline(y, CenterlineRow { x0: 0, x1: dem.width - 1, h: 0.0, dl: 1.0 });
        }
        dem.set_lab(hl + 5, hw, CoarseLabel::Traversable);
        dem.set_lab(hl + 10, hw, CoarseLabel::NonTraversable);
        dem.set_demhmin(hl + 10, hw, 1.0);
        dem.set_demhmax(hl + 10, hw, 1.0);

        ObstacleSublabeler::sublabel(&mut dem, &cfg);
        assert_eq!(dem.sublab(hl + 10, hw), FineLabel::PositiveObstacle);
    }

    /// Boundary scenario 5 (spec §8): a 10-cell UNKNOWN gap between two
    /// TRAVERSABLE cells, with `dl=1m`, exceeds `max(2, dl)` and gets
    /// inferred as a negative obstacle.
    #[test]
    fn test_negative_obstacle_from_blind_gap() {
        let cfg = cfg_with_ring(1.0);
        let mut dem = Dem::new(cfg.width_cells(), cfg.length_cells());
        dem.zero_for_frame();
        let hw = dem.width / 2;
        let hl = dem.length / 2;
        for y in 0..dem.length {
            dem.set_centerline(y, CenterlineRow { x0: 0, x1: dem.width - 1, h: 0.0, dl: 1.0 });
        }
        dem.set_lab(hl + 5, hw, CoarseLabel::Traversable);
        dem.set_lab(hl + 15, hw, CoarseLabel::Traversable);
        // rows between stay UNKNOWN (the zero_for_frame default)

        ObstacleSublabeler::sublabel(&mut dem, &cfg);
        assert_eq!(dem.sublab(hl + 10, hw), FineLabel::NegativeObstacle);
    }

    #[test]
    fn test_near_vehicle_ring_is_never_a_scan_start() {
        let cfg = cfg_with_ring(100.0);
        let mut dem = Dem::new(cfg.width_cells(), cfg.length_cells());
        dem.zero_for_frame();
        let hw = dem.width / 2;
        let hl = dem.length / 2;
        dem.set_lab(hl, hw, CoarseLabel::Traversable);
        dem.set_lab(hl + 5, hw, CoarseLabel::NonTraversable);
        dem.set_demhmin(hl + 5, hw, 5.0);
        dem.set_demhmax(hl + 5, hw, 5.0);

        ObstacleSublabeler::sublabel(&mut dem, &cfg);
        assert_eq!(dem.sublab(hl + 5, hw), FineLabel::Unknown);
    }
}
