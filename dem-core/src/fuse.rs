use rayon::prelude::*;

use dem_common::structures::SaturatingCount;

use crate::config::{PipelineConfig, INVALIDDOUBLE};
use crate::dem::Dem;
use crate::labels::CoarseLabel;

const BLIND_OUTSIDE_RANGE_M: f64 = 60.0;
const CLOSE_RING_M: f64 = 10.0;
const CLOSE_OCCLUSION_BOOST: f64 = 1.8;
const FAR_OCCLUSION_BOOST: f64 = 1.1;
const DISAGREE_DECAY_SCALE: f64 = 2.5;
const DISAGREE_FLIP_THRESHOLD: f64 = 0.2;

#[derive(Copy, Clone)]
struct CellUpdate {
    lab: CoarseLabel,
    lpr: f64,
    demg: f64,
    demgnum: u16,
    demhmin: f64,
    demhmax: f64,
    demhnum: u16,
}

/// Merges the pose-predicted global DEM with the current local DEM (spec
/// §4.3). Both already share the current pose, and the grids are the same
/// shape, so each target cell only ever depends on the source cell at the
/// same `(row, col)` — this stage parallelizes cleanly by row.
pub struct GlobalDemFuser;

impl GlobalDemFuser {
    pub fn fuse(glo: &mut Dem, loc: &Dem, cfg: &PipelineConfig) {
        if !glo.dataon {
            glo.copy_all_from(loc);
            return;
        }

        let (width, length) = (glo.width, glo.length);
        let (half_w, half_l) = (width / 2, length / 2);

        let updates: Vec<Option<CellUpdate>> = (0..length)
            .into_par_iter()
            .flat_map(|row| {
                (0..width)
                    .map(|col| {
                        Self::fuse_cell(glo, loc, row, col, half_w, half_l, cfg)
                    })
                    .collect::<Vec<_>>()
            })
            .collect();

        for row in 0..length {
            for col in 0..width {
                if let Some(u) = updates[(row * width + col) as usize] {
                    glo.set_lab(row, col, u.lab);
                    glo.set_lpr(row, col, u.lpr);
                    glo.set_demg(row, col, u.demg);
                    glo.set_demgnum(row, col, SaturatingCount::new(u.demgnum));
                    glo.set_demhmin(row, col, u.demhmin);
                    glo.set_demhmax(row, col, u.demhmax);
                    glo.set_demhnum(row, col, SaturatingCount::new(u.demhnum));
                }
            }
        }
    }

    fn fuse_cell(
        glo: &Dem,
        loc: &Dem,
        row: isize,
        col: isize,
        half_w: isize,
        half_l: isize,
        cfg: &PipelineConfig,
    ) -> Option<CellUpdate> {
        let (dx, dy) = (col - half_w, row - half_l);
        let dist_m = ((dx * dx + dy * dy) as f64).sqrt() * cfg.pix_siz;

        let loc_lab = loc.lab(row, col);
        let glo_lab = glo.lab(row, col);

        if loc_lab == CoarseLabel::Unknown && dist_m > BLIND_OUTSIDE_RANGE_M {
            return None;
        }

        let (new_lab, new_lpr) = if glo_lab == CoarseLabel::Unknown {
            if loc_lab == CoarseLabel::Unknown {
                return None;
            }
            (loc_lab, loc.lpr(row, col))
        } else if loc_lab == CoarseLabel::Unknown {
            let f = if dist_m <= CLOSE_RING_M { CLOSE_OCCLUSION_BOOST } else { FAR_OCCLUSION_BOOST };
            (glo_lab, (glo.lpr(row, col) * f).min(1.0))
        } else if loc_lab == glo_lab {
            (glo_lab, (glo.lpr(row, col) * (2.0 * loc.lpr(row, col))).min(1.0))
        } else if dist_m <= CLOSE_RING_M {
            // disagreement inside the 10m ring: trust the persistent map
            (glo_lab, glo.lpr(row, col))
        } else {
            let decayed = (glo.lpr(row, col) * (1.2 - loc.lpr(row, col)) * DISAGREE_DECAY_SCALE).min(1.0);
            if decayed < DISAGREE_FLIP_THRESHOLD {
                (loc_lab, loc.lpr(row, col))
            } else {
                (glo_lab, decayed)
            }
        };

        let (demg, demgnum) = Self::fuse_ground(glo, loc, row, col);
        let (demhmin, demhmax, demhnum) = Self::fuse_nonground(glo, loc, row, col);

        Some(CellUpdate {
            lab: new_lab,
            lpr: new_lpr,
            demg,
            demgnum,
            demhmin,
            demhmax,
            demhnum,
        })
    }

    fn fuse_ground(glo: &Dem, loc: &Dem, row: isize, col: isize) -> (f64, u16) {
        let (gn, ln) = (glo.demgnum(row, col), loc.demgnum(row, col));
        if gn == 0 && ln == 0 {
            return (INVALIDDOUBLE, 0);
        }
        let total = gn as u32 + ln as u32;
        let mean = (glo.demg(row, col) * gn as f64 + loc.demg(row, col) * ln as f64) / total as f64;
        (mean, total.min(SaturatingCount::MAX as u32) as u16)
    }

    fn fuse_nonground(glo: &Dem, loc: &Dem, row: isize, col: isize) -> (f64, f64, u16) {
        let (gn, ln) = (glo.demhnum(row, col), loc.demhnum(row, col));
        if gn == 0 && ln == 0 {
            return (INVALIDDOUBLE, INVALIDDOUBLE, 0);
        }
        let min = if gn == 0 {
            loc.demhmin(row, col)
        } else if ln == 0 {
            glo.demhmin(row, col)
        } else {
            glo.demhmin(row, col).min(loc.demhmin(row, col))
        };
        let max = if gn == 0 {
            loc.demhmax(row, col)
        } else if ln == 0 {
            glo.demhmax(row, col)
        } else {
            glo.demhmax(row, col).max(loc.demhmax(row, col))
        };
        let total = gn as u32 + ln as u32;
        (min, max, total.min(SaturatingCount::MAX as u32) as u16)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dem_with(width: isize, length: isize) -> Dem {
        let mut dem = Dem::new(width, length);
        dem.zero_for_frame();
        dem.dataon = true;
        dem
    }

    /// Fuser idempotence law (spec §8): fusing a local cell at full
    /// confidence into an already-agreeing, full-confidence global cell
    /// leaves `lpr` at 1.0 (after the `min(1, ...)` cap).
    #[test]
    fn test_idempotent_at_full_confidence() {
        let cfg = PipelineConfig::new();
        let (w, l) = (cfg.width_cells(), cfg.length_cells());
        let (hw, hl) = (w / 2, l / 2);

        let mut glo = dem_with(w, l);
        glo.set_lab(hl, hw, CoarseLabel::Traversable);
        glo.set_lpr(hl, hw, 1.0);

        let mut loc = dem_with(w, l);
        loc.set_lab(hl, hw, CoarseLabel::Traversable);
        loc.set_lpr(hl, hw, 1.0);

        GlobalDemFuser::fuse(&mut glo, &loc, &cfg);
        assert_eq!(glo.lpr(hl, hw), 1.0);
        assert_eq!(glo.lab(hl, hw), CoarseLabel::Traversable);
    }

    /// Boundary scenario 6 (spec §8): disagreement outside the 10m ring
    /// decays confidence, then flips the label once confidence falls below
    /// 0.2 on a second identical observation.
    #[test]
    fn test_disagreement_outside_ring_decays_then_flips() {
        let mut cfg = PipelineConfig::new();
        cfg.wid_siz = 80.0;
        cfg.len_siz = 80.0;
        cfg.pix_siz = 1.0;
        let (w, l) = (cfg.width_cells(), cfg.length_cells());
        let (hw, hl) = (w / 2, l / 2);
        let target_col = hw; // 15 cells forward => 15m > 10m ring
        let target_row = hl + 15;

        let mut glo = dem_with(w, l);
        glo.set_lab(target_row, target_col, CoarseLabel::Traversable);
        glo.set_lpr(target_row, target_col, 0.3);

        let mut loc = dem_with(w, l);
        loc.set_lab(target_row, target_col, CoarseLabel::NonTraversable);
        loc.set_lpr(target_row, target_col, 0.9);

        GlobalDemFuser::fuse(&mut glo, &loc, &cfg);
        assert_eq!(glo.lab(target_row, target_col), CoarseLabel::Traversable);
        assert!((glo.lpr(target_row, target_col) - 0.225).abs() < 1e-9);

        GlobalDemFuser::fuse(&mut glo, &loc, &cfg);
        assert_eq!(glo.lab(target_row, target_col), CoarseLabel::NonTraversable);
        assert_eq!(glo.lpr(target_row, target_col), 0.9);
    }

    #[test]
    fn test_bootstrap_from_empty_global() {
        let cfg = PipelineConfig::new();
        let (w, l) = (cfg.width_cells(), cfg.length_cells());
        let mut glo = Dem::new(w, l);
        let mut loc = dem_with(w, l);
        let (hw, hl) = (w / 2, l / 2);
        loc.set_lab(hl, hw, CoarseLabel::Traversable);
        loc.set_lpr(hl, hw, 0.75);

        GlobalDemFuser::fuse(&mut glo, &loc, &cfg);
        assert!(glo.dataon);
        assert_eq!(glo.lab(hl, hw), CoarseLabel::Traversable);
        assert_eq!(glo.lpr(hl, hw), 0.75);
    }
}
