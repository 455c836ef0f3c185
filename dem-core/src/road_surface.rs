use crate::dem::Dem;
use crate::labels::{CoarseLabel, FineLabel};
use crate::plane_fit::PlaneFit;

const BLOCK: isize = 10;
const MAX_DEM_PT_NUM: usize = 1000;
const MIN_SAMPLES: usize = 10;
const PRIMARY_THRESHOLD: f64 = 0.696;
const CENTERLINE_SCOPED_THRESHOLD: f64 = 0.174;

/// Plane-fits ground heights in 10x10 blocks and assigns the fine ground
/// sub-label from the dominant tilt (spec §4.5). Row-independent across
/// blocks, but each block writes every cell in its own footprint, so this
/// is kept as a simple sequential block raster rather than sharded —
/// the per-block cost (at most 1000 samples) is small relative to the
/// row-parallel stages.
pub struct RoadSurfaceSublabeler;

impl RoadSurfaceSublabeler {
    /// Primary form: scans the whole grid in 10x10 blocks, ±0.696 rad
    /// thresholds.
    pub fn sublabel(dem: &mut Dem) {
        let (width, length) = (dem.width, dem.length);
        let mut by = 0;
        while by < length {
            let mut bx = 0;
            while bx < width {
                Self::process_block(dem, by, bx, width, length, None, PRIMARY_THRESHOLD, false);
                bx += BLOCK;
            }
            by += BLOCK;
        }
    }

    /// Centerline-scoped form: restricts the sample set in each block to
    /// cells within that row's `centerln[y].x0..=x1` corridor and uses the
    /// tighter ±0.174 rad thresholds (spec §4.5).
    ///
    /// The side-slope branch here tests `ax` a second time instead of `ay`,
    /// matching the source this was distilled from — see the `// TODO` at
    /// `classify_centerline_scoped`.
    pub fn sublabel_centerline_scoped(dem: &mut Dem) {
        let (width, length) = (dem.width, dem.length);
        let mut by = 0;
        while by < length {
            let mut bx = 0;
            while bx < width {
                Self::process_block(dem, by, bx, width, length, Some(()), CENTERLINE_SCOPED_THRESHOLD, true);
                bx += BLOCK;
            }
            by += BLOCK;
        }
    }

    fn process_block(
        dem: &mut Dem,
        by: isize,
        bx: isize,
        width: isize,
        length: isize,
        scoped: Option<()>,
        threshold: f64,
        buggy_side_branch: bool,
    ) {
        let y_end = (by + BLOCK).min(length);
        let x_end = (bx + BLOCK).min(width);

        let in_corridor = |dem: &Dem, y: isize, x: isize| -> bool {
            if scoped.is_none() {
                return true;
            }
            let row = dem.centerline(y);
            x >= row.x0 && x <= row.x1
        };

        let mut has_seed = false;
        'seek: for y in by..y_end {
            for x in bx..x_end {
                if dem.lab(y, x) == CoarseLabel::Traversable
                    && dem.sublab(y, x) == FineLabel::Unknown
                    && in_corridor(dem, y, x)
                {
                    has_seed = true;
                    break 'seek;
                }
            }
        }
        if !has_seed {
            return;
        }

        let mut samples = Vec::new();
        'collect: for y in by..y_end {
            for x in bx..x_end {
                if dem.lab(y, x) == CoarseLabel::Traversable
                    && dem.demgnum(y, x) > 0
                    && in_corridor(dem, y, x)
                {
                    samples.push((x as f64, y as f64, dem.demg(y, x)));
                    if samples.len() >= MAX_DEM_PT_NUM {
                        break 'collect;
                    }
                }
            }
        }

        let (label, groll, gpitch) = if samples.len() < MIN_SAMPLES {
            (FineLabel::EdgePoints, 0.0, 0.0)
        } else {
            match PlaneFit::fit(&samples) {
                Some(fit) => {
                    let (ax, ay) = fit.roll_pitch();
                    let label = if buggy_side_branch {
                        Self::classify_centerline_scoped(ax, ay, threshold)
                    } else {
                        Self::classify(ax, ay, threshold)
                    };
                    (label, ax, ay)
                }
                // too few samples is EDGEPOINTS (above); a fit that fails on
                // >= MIN_SAMPLES points is near-planar/ill-conditioned, not
                // sparse, so it falls back to FLATGROUND instead.
                None => (FineLabel::FlatGround, 0.0, 0.0),
            }
        };

        for y in by..y_end {
            for x in bx..x_end {
                if dem.lab(y, x) == CoarseLabel::Traversable && in_corridor(dem, y, x) {
                    dem.set_sublab(y, x, label);
                    dem.set_groll(y, x, groll);
                    dem.set_gpitch(y, x, gpitch);
                }
            }
        }
    }

    fn classify(ax: f64, ay: f64, threshold: f64) -> FineLabel {
        if ax.abs() > ay.abs() {
            if ax > threshold {
                FineLabel::Upslope
            } else if ax < -threshold {
                FineLabel::Downslope
            } else {
                FineLabel::FlatGround
            }
        } else if ay > threshold {
            FineLabel::RightSideSlope
        } else if ay < -threshold {
            FineLabel::LeftSideSlope
        } else {
            FineLabel::FlatGround
        }
    }

    /// TODO: the else-if below tests `ax < -threshold`, not `ay`, matching
    /// `examples/original_source`'s centerline-scoped branch. Left as
    /// observed rather than silently corrected to `ay < -threshold`.
    fn classify_centerline_scoped(ax: f64, ay: f64, threshold: f64) -> FineLabel {
        if ax.abs() > ay.abs() {
            if ax > threshold {
                FineLabel::Upslope
            } else if ax < -threshold {
                FineLabel::Downslope
            } else {
                FineLabel::FlatGround
            }
        } else if ay > threshold {
            FineLabel::RightSideSlope
        } else if ax < -threshold {
            FineLabel::LeftSideSlope
        } else {
            FineLabel::FlatGround
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dem_common::structures::SaturatingCount;

    fn flat_block(dem: &mut Dem, by: isize, bx: isize, h: f64) {
        for y in by..by + BLOCK {
            for x in bx..bx + BLOCK {
                dem.set_lab(y, x, CoarseLabel::Traversable);
                dem.set_demg(y, x, h);
                dem.set_demgnum(y, x, SaturatingCount::new(1));
            }
        }
    }

    #[test]
    fn test_flat_block_gets_flatground() {
        let mut dem = Dem::new(20, 20);
        dem.zero_for_frame();
        flat_block(&mut dem, 0, 0, 1.0);
        RoadSurfaceSublabeler::sublabel(&mut dem);
        assert_eq!(dem.sublab(5, 5), FineLabel::FlatGround);
        assert!((dem.groll(5, 5)).abs() < 1e-9);
    }

    #[test]
    fn test_sparse_block_is_edgepoints() {
        let mut dem = Dem::new(20, 20);
        dem.zero_for_frame();
        dem.set_lab(0, 0, CoarseLabel::Traversable);
        dem.set_demg(0, 0, 1.0);
        dem.set_demgnum(0, 0, SaturatingCount::new(1));
        RoadSurfaceSublabeler::sublabel(&mut dem);
        assert_eq!(dem.sublab(0, 0), FineLabel::EdgePoints);
    }

    #[test]
    fn test_upslope_classified_by_dominant_tilt() {
        let mut dem = Dem::new(20, 20);
        dem.zero_for_frame();
        for y in 0..10 {
            for x in 0..10 {
                dem.set_lab(y, x, CoarseLabel::Traversable);
                dem.set_demg(y, x, 2.0 * y as f64);
                dem.set_demgnum(y, x, SaturatingCount::new(1));
            }
        }
        RoadSurfaceSublabeler::sublabel(&mut dem);
        assert_eq!(dem.sublab(5, 5), FineLabel::Upslope);
    }
}
