use rayon::prelude::*;

use crate::config::{PipelineConfig, INVALIDDOUBLE};
use crate::dem::Dem;
use crate::labels::CoarseLabel;
use crate::pose::Pose;
use crate::range_view::RangeView;

/// Builds the per-frame local DEM from a range view (spec §4.1).
pub struct LocalDemBuilder;

impl LocalDemBuilder {
    /// Rasterizes `view` into `local`, computing ground/non-ground height
    /// statistics, the coarse label, and its confidence. `local` is zeroed
    /// first so stale data from a prior frame never leaks through.
    pub fn build(local: &mut Dem, view: &RangeView, pose: Pose, cfg: &PipelineConfig) {
        local.zero_for_frame();
        let (width, length) = (local.width, local.length);

        Self::splat_points(local, view, cfg);
        Self::finalize_ground_heights(local, width, length);
        Self::assign_coarse_labels(local, width, length, cfg);
        Self::apply_consistency_filter(local, width, length);

        local.trans = pose;
        local.dataon = true;
    }

    fn splat_points(local: &mut Dem, view: &RangeView, cfg: &PipelineConfig) {
        let (half_w, half_l) = (local.width / 2, local.length / 2);
        for row in 0..view.length {
            for col in 0..view.width {
                let rp = view.point(row, col);
                if !rp.valid {
                    continue;
                }
                let ix = (rp.pt.x / cfg.pix_siz).round() as isize + half_w;
                let iy = (rp.pt.y / cfg.pix_siz).round() as isize + half_l;
                let ground = view.is_ground_plausible(row, col);
                for dy in 0..2 {
                    for dx in 0..2 {
                        let (cx, cy) = (ix + dx, iy + dy);
                        if cx < 0 || cy < 0 || cx >= local.width || cy >= local.length {
                            continue;
                        }
                        if ground {
                            let sum = if local.demgnum(cy, cx) == 0 {
                                rp.pt.z
                            } else {
                                local.demg(cy, cx) + rp.pt.z
                            };
                            local.set_demg(cy, cx, sum);
                            local.set_demgnum(
                                cy,
                                cx,
                                dem_common::structures::SaturatingCount::new(local.demgnum(cy, cx) + 1),
                            );
                        } else {
                            let cur_min = local.demhmin(cy, cx);
                            let cur_max = local.demhmax(cy, cx);
                            let new_min = if local.demhnum(cy, cx) == 0 { rp.pt.z } else { cur_min.min(rp.pt.z) };
                            let new_max = if local.demhnum(cy, cx) == 0 { rp.pt.z } else { cur_max.max(rp.pt.z) };
                            local.set_demhmin(cy, cx, new_min);
                            local.set_demhmax(cy, cx, new_max);
                            local.set_demhnum(
                                cy,
                                cx,
                                dem_common::structures::SaturatingCount::new(local.demhnum(cy, cx) + 1),
                            );
                        }
                    }
                }
            }
        }
    }

    fn finalize_ground_heights(local: &mut Dem, width: isize, length: isize) {
        for row in 0..length {
            for col in 0..width {
                if local.demgnum(row, col) > 0 {
                    let mean = local.demg(row, col) / local.demgnum(row, col) as f64;
                    local.set_demg(row, col, mean);
                } else {
                    local.set_demg(row, col, INVALIDDOUBLE);
                }
            }
        }
    }

    /// Finds the nearest ground height within a `radius`-cell neighborhood
    /// of `(row, col)`, per §4.1's "look in the 5×5 neighborhood for the
    /// nearest ground height".
    fn nearest_ground_height(local: &Dem, row: isize, col: isize, radius: isize) -> Option<f64> {
        let mut best: Option<(isize, f64)> = None;
        for dy in -radius..=radius {
            for dx in -radius..=radius {
                let (r, c) = (row + dy, col + dx);
                if local.demgnum(r, c) > 0 {
                    let d2 = dx * dx + dy * dy;
                    if best.map(|(bd, _)| d2 < bd).unwrap_or(true) {
                        best = Some((d2, local.demg(r, c)));
                    }
                }
            }
        }
        best.map(|(_, z)| z)
    }

    fn assign_coarse_labels(local: &mut Dem, width: isize, length: isize, cfg: &PipelineConfig) {
        for row in 0..length {
            for col in 0..width {
                let has_ground = local.demgnum(row, col) > 0;
                let has_nonground = local.demhnum(row, col) > 0;
                let label = if !has_ground && !has_nonground {
                    CoarseLabel::Unknown
                } else if has_ground && has_nonground {
                    // overhanging structure / branches permitted
                    CoarseLabel::Traversable
                } else if has_ground {
                    CoarseLabel::Traversable
                } else {
                    match Self::nearest_ground_height(local, row, col, 2) {
                        Some(gz) => {
                            let (hmin, hmax) = (local.demhmin(row, col), local.demhmax(row, col));
                            if hmin >= gz - cfg.pos_obs_min_height && hmax <= gz + cfg.pos_obs_min_height {
                                CoarseLabel::Traversable
                            } else {
                                CoarseLabel::NonTraversable
                            }
                        }
                        None => CoarseLabel::NonTraversable,
                    }
                };
                local.set_lab(row, col, label);
                if label == CoarseLabel::Unknown {
                    local.set_lpr(row, col, 0.0);
                }
            }
        }
    }

    /// Removes irregular isolated labels via a 3×3 neighborhood consistency
    /// vote (§4.1). Row-independent given the finalized label grid from the
    /// previous pass, so this runs in parallel across rows.
    fn apply_consistency_filter(local: &mut Dem, width: isize, length: isize) {
        let labels: Vec<CoarseLabel> = (0..length)
            .into_par_iter()
            .flat_map(|row| {
                (0..width)
                    .map(|col| local.lab(row, col))
                    .collect::<Vec<_>>()
            })
            .collect();

        let results: Vec<(CoarseLabel, f64)> = (0..length)
            .into_par_iter()
            .flat_map(|row| {
                (0..width)
                    .map(|col| {
                        let center = labels[(row * width + col) as usize];
                        if center == CoarseLabel::Unknown {
                            return (CoarseLabel::Unknown, 0.0);
                        }
                        let mut matches = 0;
                        let mut total = 0;
                        for dy in -1..=1 {
                            for dx in -1..=1 {
                                let (r, c) = (row + dy, col + dx);
                                if r < 0 || c < 0 || r >= length || c >= width {
                                    continue;
                                }
                                total += 1;
                                if labels[(r * width + c) as usize] == center {
                                    matches += 1;
                                }
                            }
                        }
                        if matches < 2 {
                            (CoarseLabel::Unknown, 0.0)
                        } else {
                            (center, matches as f64 / total as f64 * 0.5 + 0.5)
                        }
                    })
                    .collect::<Vec<_>>()
            })
            .collect();

        for row in 0..length {
            for col in 0..width {
                let (label, lpr) = results[(row * width + col) as usize];
                local.set_lab(row, col, label);
                local.set_lpr(row, col, lpr);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dem_common::structures::Point2D;

    fn small_cfg() -> PipelineConfig {
        let mut cfg = PipelineConfig::new();
        cfg.wid_siz = 2.0;
        cfg.len_siz = 2.0;
        cfg.pix_siz = 1.0;
        cfg
    }

    /// Boundary scenario 1 (spec §8): a single ground hit is an isolated
    /// label and gets filtered back to Unknown by the consistency filter.
    #[test]
    fn test_single_ground_hit_is_filtered_to_unknown() {
        let cfg = small_cfg();
        let mut view = RangeView::new(1, 1);
        view.set_point(0, 0, crate::range_view::RangePoint::new(0.0, 0.0, 0.0));
        view.set_segments(vec![crate::range_view::RegionSegment { ptnum: 1 }]);
        view.set_region_id(0, 0, 1);

        let mut local = Dem::new(cfg.width_cells(), cfg.length_cells());
        LocalDemBuilder::build(&mut local, &view, Pose::new(0.0, Point2D::new(0.0, 0.0)), &cfg);

        let (hw, hl) = (local.width / 2, local.length / 2);
        assert_eq!(local.lab(hl, hw), CoarseLabel::Unknown);
    }

    /// Boundary scenario 2 (spec §8): a solid 3x3 block of ground hits
    /// keeps its label with lpr = 1.0.
    #[test]
    fn test_3x3_block_survives_filter_with_full_confidence() {
        let cfg = PipelineConfig::new();
        let width = 9;
        let length = 9;
        let mut local = Dem::new(width, length);
        local.zero_for_frame();
        let (hw, hl) = (width / 2, length / 2);
        for dy in -1..=1 {
            for dx in -1..=1 {
                local.set_demg(hl + dy, hw + dx, 0.0);
                local.set_demgnum(hl + dy, hw + dx, dem_common::structures::SaturatingCount::new(1));
            }
        }
        LocalDemBuilder::assign_coarse_labels(&mut local, width, length, &cfg);
        LocalDemBuilder::apply_consistency_filter(&mut local, width, length);

        assert_eq!(local.lab(hl, hw), CoarseLabel::Traversable);
        assert!((local.lpr(hl, hw) - 1.0).abs() < 1e-9);
    }
}
