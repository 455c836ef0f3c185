use dem_common::structures::Point3D;

use crate::error::DemError;

/// One raw LiDAR return: a 3-D point plus the range view's validity bit.
/// Mirrors the `point3fi`/`i` validity flag from the external DSV adapter
/// (spec §6); `RangeView` never reaches into DSV/IMU framing itself.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct RangePoint {
    pub pt: Point3D,
    pub valid: bool,
}

impl RangePoint {
    pub fn new(x: f64, y: f64, z: f64) -> RangePoint {
        RangePoint {
            pt: Point3D::new(x, y, z),
            valid: true,
        }
    }

    pub fn invalid() -> RangePoint {
        RangePoint::default()
    }
}

/// A scan-segment a ground-plausible region's points were assigned to by
/// the external contour-segmentation stage (spec §4.1, `segbuf` in the
/// original). Only `ptnum` matters to the core: a region with `ptnum == 0`
/// contributes no ground-plausible points.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct RegionSegment {
    pub ptnum: usize,
}

/// The per-frame range image handed to the core by the external RangeView
/// adapter (spec §6): a `width × length` array of 3-D points with
/// per-point region assignment, plus the region segment table.
pub struct RangeView {
    pub width: isize,
    pub length: isize,
    pts: Vec<RangePoint>,
    region_id: Vec<usize>,
    segbuf: Vec<RegionSegment>,
}

impl RangeView {
    pub fn new(width: isize, length: isize) -> RangeView {
        let n = (width.max(0) * length.max(0)) as usize;
        RangeView {
            width,
            length,
            pts: vec![RangePoint::invalid(); n],
            region_id: vec![0; n],
            segbuf: Vec::new(),
        }
    }

    /// Wraps an already-decoded flat point buffer (as handed off by the
    /// external DSV/IMU adapter) into a `RangeView`, checking it actually
    /// holds `width * length` entries rather than silently truncating or
    /// indexing past its end.
    pub fn from_points(width: isize, length: isize, pts: Vec<RangePoint>) -> Result<RangeView, DemError> {
        let expected = (width.max(0) * length.max(0)) as usize;
        if pts.len() != expected {
            return Err(DemError::RangeViewSizeMismatch { expected, actual: pts.len() });
        }
        Ok(RangeView {
            width,
            length,
            region_id: vec![0; expected],
            pts,
            segbuf: Vec::new(),
        })
    }

    fn index(&self, row: isize, col: isize) -> Option<usize> {
        if row < 0 || col < 0 || row >= self.length || col >= self.width {
            return None;
        }
        Some((row * self.width + col) as usize)
    }

    pub fn point(&self, row: isize, col: isize) -> RangePoint {
        self.index(row, col).map(|i| self.pts[i]).unwrap_or_default()
    }

    pub fn set_point(&mut self, row: isize, col: isize, point: RangePoint) {
        if let Some(i) = self.index(row, col) {
            self.pts[i] = point;
        }
    }

    pub fn region_id(&self, row: isize, col: isize) -> usize {
        self.index(row, col).map(|i| self.region_id[i]).unwrap_or(0)
    }

    pub fn set_region_id(&mut self, row: isize, col: isize, region: usize) {
        if let Some(i) = self.index(row, col) {
            self.region_id[i] = region;
        }
    }

    pub fn set_segments(&mut self, segbuf: Vec<RegionSegment>) {
        self.segbuf = segbuf;
    }

    /// True if the point at `(row, col)` falls in a region with at least
    /// one accumulated point, i.e. is ground-plausible (spec §4.1:
    /// "A point is ground-plausible if its `regionID` indexes a non-empty
    /// region segment").
    pub fn is_ground_plausible(&self, row: isize, col: isize) -> bool {
        let region = self.region_id(row, col);
        region != 0
            && self
                .segbuf
                .get(region - 1)
                .map(|s| s.ptnum > 0)
                .unwrap_or(false)
    }

    /// Marks every point within `range_m` planar distance of the vehicle as
    /// invalid. Grounded on `ReadOneDsvFrame`'s `dis2Vehicle < 4.0` check in
    /// `examples/original_source/main.cpp`: points the sensor cannot
    /// usefully see beneath the chassis are dropped before they ever reach
    /// the LocalDEM builder, rather than only being exempted from obstacle
    /// classification downstream (§4.6's blind ring).
    pub fn invalidate_near_vehicle(&mut self, range_m: f64) {
        for p in self.pts.iter_mut() {
            if p.valid {
                let dis = (p.pt.x * p.pt.x + p.pt.y * p.pt.y).sqrt();
                if dis < range_m {
                    p.valid = false;
                }
            }
        }
    }

    /// Linearly interpolates short runs of invalid cells within a scan row
    /// when the endpoints are close enough to plausibly be the same
    /// surface, per `SmoothingData` in `examples/original_source/main.cpp`.
    /// Not invoked by [`crate::pipeline::DemPipeline::process_frame`] — an
    /// opt-in pre-processing step callers may run on a freshly-built
    /// `RangeView` before handing it to the pipeline.
    pub fn smooth_gaps(&mut self, max_gap: usize, base_error: f64, error_factor: f64, max_error: f64) {
        for row in 0..self.length {
            let mut col = 1;
            while col < self.width - 1 {
                let prev_valid = self.point(row, col - 1).valid;
                let here_valid = self.point(row, col).valid;
                if prev_valid && !here_valid {
                    let mut end = col + 1;
                    while end < self.width && !self.point(row, end).valid {
                        end += 1;
                    }
                    if end >= self.width {
                        break;
                    }
                    let run_len = end - (col - 1);
                    if run_len > max_gap {
                        col = end;
                        continue;
                    }
                    let p1 = self.point(row, col - 1).pt;
                    let p2 = self.point(row, end).pt;
                    let dist = ((p2.x - p1.x).powi(2) + (p2.y - p1.y).powi(2) + (p2.z - p1.z).powi(2)).sqrt();
                    let rng1 = (p1.x * p1.x + p1.y * p1.y + p1.z * p1.z).sqrt();
                    let rng2 = (p2.x * p2.x + p2.y * p2.y + p2.z * p2.z).sqrt();
                    let rng = rng1.max(rng2);
                    let max_dis = max_error.min(base_error.max(error_factor * run_len as f64 * rng));
                    if dist < max_dis {
                        let n = (end - (col - 1)) as f64;
                        for k in col..end {
                            let t = (k - (col - 1)) as f64 / n;
                            let interp = RangePoint::new(
                                p1.x + (p2.x - p1.x) * t,
                                p1.y + (p2.y - p1.y) * t,
                                p1.z + (p2.z - p1.z) * t,
                            );
                            self.set_point(row, k, interp);
                        }
                    }
                    col = end;
                } else {
                    col += 1;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_points_accepts_matching_buffer() {
        let pts = vec![RangePoint::invalid(); 6];
        let rv = RangeView::from_points(3, 2, pts).unwrap();
        assert_eq!(rv.width, 3);
        assert_eq!(rv.length, 2);
    }

    #[test]
    fn test_from_points_rejects_mismatched_buffer() {
        let pts = vec![RangePoint::invalid(); 5];
        let err = RangeView::from_points(3, 2, pts).unwrap_err();
        assert_eq!(err, DemError::RangeViewSizeMismatch { expected: 6, actual: 5 });
    }

    #[test]
    fn test_ground_plausible_requires_nonempty_region() {
        let mut rv = RangeView::new(3, 3);
        rv.set_segments(vec![RegionSegment { ptnum: 0 }, RegionSegment { ptnum: 5 }]);
        rv.set_region_id(1, 1, 1);
        rv.set_region_id(1, 2, 2);
        assert!(!rv.is_ground_plausible(1, 1));
        assert!(rv.is_ground_plausible(1, 2));
    }

    #[test]
    fn test_invalidate_near_vehicle() {
        let mut rv = RangeView::new(1, 1);
        rv.set_point(0, 0, RangePoint::new(1.0, 1.0, 0.0));
        rv.invalidate_near_vehicle(4.0);
        assert!(!rv.point(0, 0).valid);
    }

    #[test]
    fn test_invalidate_near_vehicle_keeps_far_points() {
        let mut rv = RangeView::new(1, 1);
        rv.set_point(0, 0, RangePoint::new(10.0, 10.0, 0.0));
        rv.invalidate_near_vehicle(4.0);
        assert!(rv.point(0, 0).valid);
    }

    #[test]
    fn test_smooth_gaps_interpolates_short_run() {
        let mut rv = RangeView::new(5, 1);
        rv.set_point(0, 0, RangePoint::new(1.0, 0.0, 0.0));
        rv.set_point(0, 4, RangePoint::new(1.0, 0.4, 0.0));
        rv.smooth_gaps(3, 1.0, 1.0, 10.0);
        assert!(rv.point(0, 2).valid);
        assert!((rv.point(0, 2).pt.y - 0.2).abs() < 1e-9);
    }

    #[test]
    fn test_smooth_gaps_skips_long_run() {
        let mut rv = RangeView::new(6, 1);
        rv.set_point(0, 0, RangePoint::new(1.0, 0.0, 0.0));
        rv.set_point(0, 5, RangePoint::new(1.0, 0.5, 0.0));
        rv.smooth_gaps(2, 1.0, 1.0, 10.0);
        assert!(!rv.point(0, 2).valid);
    }
}
