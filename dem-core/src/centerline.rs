use crate::config::{PipelineConfig, INVALIDDOUBLE};
use crate::dem::{CenterlineRow, Dem};
use crate::labels::CoarseLabel;

const GAP_TOLERANCE: i32 = 5;
const MIN_RING_SPACING: f64 = 0.3;

/// Traces the traversable corridor along the forward axis and the expected
/// inter-ring ground spacing per row (spec §4.4). Must run sequentially —
/// each row's seed column depends on the previous row's extent.
pub struct CenterlineExtractor;

impl CenterlineExtractor {
    pub fn extract(dem: &mut Dem, cfg: &PipelineConfig) {
        let (width, length) = (dem.width, dem.length);
        let center_row = length / 2;

        let seed = Self::sweep_row(dem, center_row, width / 2, width);
        dem.set_centerline(center_row, seed);

        let mut seed_x = (seed.x0 + seed.x1) / 2;
        for y in (center_row + 1)..length {
            let row = Self::sweep_row(dem, y, seed_x, width);
            seed_x = (row.x0 + row.x1) / 2;
            dem.set_centerline(y, row);
        }

        let mut seed_x = (seed.x0 + seed.x1) / 2;
        for y in (0..center_row).rev() {
            let row = Self::sweep_row(dem, y, seed_x, width);
            seed_x = (row.x0 + row.x1) / 2;
            dem.set_centerline(y, row);
        }

        Self::interpolate_missing_heights(dem, length);
        Self::compute_ring_spacing(dem, length, center_row, cfg);
    }

    /// Grows `x0` leftward and `x1` rightward from `seed_x` while cells are
    /// TRAVERSABLE, tolerating up to [`GAP_TOLERANCE`] consecutive
    /// non-traversable cells before stopping in each direction.
    fn sweep_row(dem: &Dem, y: isize, seed_x: isize, width: isize) -> CenterlineRow {
        let seed_x = seed_x.clamp(0, width - 1);
        let mut h = 0.0;
        let mut num: u64 = 0;

        let mut accumulate = |x: isize, h: &mut f64, num: &mut u64| {
            if dem.lab(y, x) == CoarseLabel::Traversable {
                let n = dem.demgnum(y, x);
                if n > 0 {
                    *h += dem.demg(y, x) * n as f64;
                    *num += n as u64;
                }
            }
        };

        accumulate(seed_x, &mut h, &mut num);

        let mut x1 = seed_x;
        let mut gap = 0;
        let mut x = seed_x + 1;
        while x < width {
            if dem.lab(y, x) == CoarseLabel::Traversable {
                x1 = x;
                gap = 0;
                accumulate(x, &mut h, &mut num);
            } else {
                gap += 1;
                if gap > GAP_TOLERANCE {
                    break;
                }
            }
            x += 1;
        }

        let mut x0 = seed_x;
        let mut gap = 0;
        let mut x = seed_x - 1;
        while x >= 0 {
            if dem.lab(y, x) == CoarseLabel::Traversable {
                x0 = x;
                gap = 0;
                accumulate(x, &mut h, &mut num);
            } else {
                gap += 1;
                if gap > GAP_TOLERANCE {
                    break;
                }
            }
            x -= 1;
        }

        CenterlineRow {
            x0,
            x1,
            h: if num > 0 { h / num as f64 } else { INVALIDDOUBLE },
            dl: 0.0,
        }
    }

    fn interpolate_missing_heights(dem: &mut Dem, length: isize) {
        let heights: Vec<f64> = (0..length).map(|y| dem.centerline(y).h).collect();

        let valid: Vec<isize> = (0..length)
            .filter(|&y| heights[y as usize] != INVALIDDOUBLE)
            .collect();
        if valid.is_empty() {
            return;
        }

        for y in 0..valid[0] {
            Self::set_height(dem, y, heights[valid[0] as usize]);
        }
        for y in (valid[valid.len() - 1] + 1)..length {
            Self::set_height(dem, y, heights[valid[valid.len() - 1] as usize]);
        }
        for w in valid.windows(2) {
            let (y0, y1) = (w[0], w[1]);
            let (h0, h1) = (heights[y0 as usize], heights[y1 as usize]);
            for y in (y0 + 1)..y1 {
                let t = (y - y0) as f64 / (y1 - y0) as f64;
                Self::set_height(dem, y, h0 + (h1 - h0) * t);
            }
        }
    }

    fn set_height(dem: &mut Dem, y: isize, h: f64) {
        let mut row = dem.centerline(y);
        row.h = h;
        dem.set_centerline(y, row);
    }

    /// Expected adjacent-ring ground footprint delta at each row's forward
    /// distance (spec §4.4 Phase 3), symmetric about the vehicle row.
    fn compute_ring_spacing(dem: &mut Dem, length: isize, center_row: isize, cfg: &PipelineConfig) {
        let delta = (cfg.vmax_ang - cfg.vmin_ang) / (cfg.num_rings as f64 - 1.0);
        for y in 0..length {
            let dis1 = (y - center_row).unsigned_abs() as f64 * cfg.pix_siz;
            let dl = (dis1.atan2(cfg.vehicle_height) + 2.0 * delta).tan() * cfg.vehicle_height - dis1;
            let dl = dl.max(MIN_RING_SPACING);
            let mut row = dem.centerline(y);
            row.dl = dl;
            dem.set_centerline(y, row);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dem_common::structures::SaturatingCount;

    fn small_cfg() -> PipelineConfig {
        let mut cfg = PipelineConfig::new();
        cfg.wid_siz = 4.0;
        cfg.len_siz = 6.0;
        cfg.pix_siz = 1.0;
        cfg
    }

    fn set_traversable(dem: &mut Dem, y: isize, x: isize, h: f64) {
        dem.set_lab(y, x, CoarseLabel::Traversable);
        dem.set_demg(y, x, h);
        dem.set_demgnum(y, x, SaturatingCount::new(1));
    }

    #[test]
    fn test_x0_never_exceeds_x1() {
        let cfg = small_cfg();
        let mut dem = Dem::new(cfg.width_cells(), cfg.length_cells());
        dem.zero_for_frame();
        let (hw, hl) = (dem.width / 2, dem.length / 2);
        for y in 0..dem.length {
            set_traversable(&mut dem, y, hw, 1.0);
        }
        CenterlineExtractor::extract(&mut dem, &cfg);
        for y in 0..dem.length {
            let row = dem.centerline(y);
            assert!(row.x0 <= row.x1);
        }
        assert_eq!(dem.centerline(hl).h, 1.0);
    }

    #[test]
    fn test_interpolates_between_bracketing_heights() {
        let cfg = small_cfg();
        let mut dem = Dem::new(cfg.width_cells(), cfg.length_cells());
        dem.zero_for_frame();
        let hw = dem.width / 2;
        // Only the first and last rows have ground hits; every row between
        // them must come back INVALIDDOUBLE from the sweep and then get
        // linearly interpolated in Phase 2.
        set_traversable(&mut dem, 0, hw, 0.0);
        set_traversable(&mut dem, dem.length - 1, hw, 10.0);
        CenterlineExtractor::extract(&mut dem, &cfg);
        let mid = dem.centerline(dem.length / 2).h;
        assert!((mid - 6.0).abs() < 1e-9);
    }
}
