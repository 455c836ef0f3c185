use dem_common::structures::{Array2D, LabelGrid, SaturatingCount};

use crate::config::INVALIDDOUBLE;
use crate::labels::{CoarseLabel, FineLabel};
use crate::pose::Pose;

/// Per-row traversable corridor summary produced by the centerline
/// extractor (§4.4) and consumed by the road-surface and obstacle
/// sub-labelers.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct CenterlineRow {
    pub x0: isize,
    pub x1: isize,
    /// Mean road height across the row's traversable span, or
    /// [`INVALIDDOUBLE`] if the row has no traversable observation.
    pub h: f64,
    /// Expected inter-ring ground footprint delta at this row's forward
    /// distance (§4.4 Phase 3).
    pub dl: f64,
}

impl CenterlineRow {
    pub fn empty(x_origin: isize) -> CenterlineRow {
        CenterlineRow {
            x0: x_origin,
            x1: x_origin,
            h: INVALIDDOUBLE,
            dl: 0.0,
        }
    }
}

/// The per-cell buffers backing a [`Dem`], allocated lazily on first
/// population (spec §3 Ownership & lifecycle) and released wholesale when
/// the owning `Dem` is zeroed back to empty.
struct Grids {
    demg: Array2D<f64>,
    demgnum: Array2D<SaturatingCount>,
    demhmin: Array2D<f64>,
    demhmax: Array2D<f64>,
    demhnum: Array2D<SaturatingCount>,
    lab: LabelGrid<CoarseLabel>,
    lpr: Array2D<f64>,
    sublab: LabelGrid<FineLabel>,
    groll: Array2D<f64>,
    gpitch: Array2D<f64>,
    centerln: Vec<CenterlineRow>,
}

impl Grids {
    fn new(width: isize, length: isize) -> Grids {
        Grids {
            demg: Array2D::new(length, width, INVALIDDOUBLE, INVALIDDOUBLE).unwrap(),
            demgnum: Array2D::new(length, width, SaturatingCount::zero(), SaturatingCount::zero())
                .unwrap(),
            demhmin: Array2D::new(length, width, INVALIDDOUBLE, INVALIDDOUBLE).unwrap(),
            demhmax: Array2D::new(length, width, INVALIDDOUBLE, INVALIDDOUBLE).unwrap(),
            demhnum: Array2D::new(length, width, SaturatingCount::zero(), SaturatingCount::zero())
                .unwrap(),
            lab: LabelGrid::new(length, width, CoarseLabel::Unknown, CoarseLabel::Unknown),
            lpr: Array2D::new(length, width, 0.0, 0.0).unwrap(),
            sublab: LabelGrid::new(length, width, FineLabel::Unknown, FineLabel::Unknown),
            groll: Array2D::new(length, width, 0.0, 0.0).unwrap(),
            gpitch: Array2D::new(length, width, 0.0, 0.0).unwrap(),
            centerln: vec![CenterlineRow::empty(width / 2); length as usize],
        }
    }

    fn zero(&mut self, width: isize) {
        self.demg.reinitialize_values(INVALIDDOUBLE);
        self.demgnum.reinitialize_values(SaturatingCount::zero());
        self.demhmin.reinitialize_values(INVALIDDOUBLE);
        self.demhmax.reinitialize_values(INVALIDDOUBLE);
        self.demhnum.reinitialize_values(SaturatingCount::zero());
        self.lab.reinitialize_values(CoarseLabel::Unknown);
        self.lpr.reinitialize_values(0.0);
        self.sublab.reinitialize_values(FineLabel::Unknown);
        self.groll.reinitialize_values(0.0);
        self.gpitch.reinitialize_values(0.0);
        for row in self.centerln.iter_mut() {
            *row = CenterlineRow::empty(width / 2);
        }
    }
}

/// A digital elevation map: one instance for the local (per-frame) map, one
/// for the persistent global map, and a scratch instance used by the
/// predictor (spec §3). Each `Dem` owns its backing buffers exclusively;
/// there is no shared/aliased storage between instances.
pub struct Dem {
    pub width: isize,
    pub length: isize,
    pub trans: Pose,
    pub dataon: bool,
    grids: Option<Grids>,
}

impl Dem {
    /// Creates an empty DEM (`dataon = false`); buffers are not allocated
    /// until [`Dem::ensure_allocated`] or [`Dem::populate`] is called.
    pub fn new(width: isize, length: isize) -> Dem {
        Dem {
            width,
            length,
            trans: Pose::default(),
            dataon: false,
            grids: None,
        }
    }

    fn ensure_allocated(&mut self) -> &mut Grids {
        if self.grids.is_none() {
            self.grids = Some(Grids::new(self.width, self.length));
        }
        self.grids.as_mut().unwrap()
    }

    /// Zeroes all buffers for a fresh frame, as done for the local DEM at
    /// the start of each call to the LocalDEM builder (§4.1). Allocates the
    /// buffers first if this is the first frame.
    pub fn zero_for_frame(&mut self) {
        let width = self.width;
        self.ensure_allocated().zero(width);
        self.dataon = false;
    }

    /// Releases all buffers, as done at process shutdown (§5) or when the
    /// scratch "temp" DEM is discarded after one prediction step (§4.2).
    pub fn release(&mut self) {
        self.grids = None;
        self.dataon = false;
    }

    pub fn is_allocated(&self) -> bool {
        self.grids.is_some()
    }

    fn grids(&self) -> &Grids {
        self.grids.as_ref().expect("Dem buffers not allocated")
    }

    fn grids_mut(&mut self) -> &mut Grids {
        self.ensure_allocated()
    }

    pub fn demg(&self, row: isize, col: isize) -> f64 {
        if self.grids.is_none() {
            return INVALIDDOUBLE;
        }
        self.grids().demg.get_value(row, col)
    }

    pub fn set_demg(&mut self, row: isize, col: isize, value: f64) {
        self.grids_mut().demg.set_value(row, col, value);
    }

    pub fn demgnum(&self, row: isize, col: isize) -> u16 {
        if self.grids.is_none() {
            return 0;
        }
        self.grids().demgnum.get_value(row, col).get()
    }

    pub fn set_demgnum(&mut self, row: isize, col: isize, value: SaturatingCount) {
        self.grids_mut().demgnum.set_value(row, col, value);
    }

    pub fn demhmin(&self, row: isize, col: isize) -> f64 {
        if self.grids.is_none() {
            return INVALIDDOUBLE;
        }
        self.grids().demhmin.get_value(row, col)
    }

    pub fn set_demhmin(&mut self, row: isize, col: isize, value: f64) {
        self.grids_mut().demhmin.set_value(row, col, value);
    }

    pub fn demhmax(&self, row: isize, col: isize) -> f64 {
        if self.grids.is_none() {
            return INVALIDDOUBLE;
        }
        self.grids().demhmax.get_value(row, col)
    }

    pub fn set_demhmax(&mut self, row: isize, col: isize, value: f64) {
        self.grids_mut().demhmax.set_value(row, col, value);
    }

    pub fn demhnum(&self, row: isize, col: isize) -> u16 {
        if self.grids.is_none() {
            return 0;
        }
        self.grids().demhnum.get_value(row, col).get()
    }

    pub fn set_demhnum(&mut self, row: isize, col: isize, value: SaturatingCount) {
        self.grids_mut().demhnum.set_value(row, col, value);
    }

    pub fn lab(&self, row: isize, col: isize) -> CoarseLabel {
        if self.grids.is_none() {
            return CoarseLabel::Unknown;
        }
        self.grids().lab.get_value(row, col)
    }

    pub fn set_lab(&mut self, row: isize, col: isize, value: CoarseLabel) {
        self.grids_mut().lab.set_value(row, col, value);
    }

    pub fn lpr(&self, row: isize, col: isize) -> f64 {
        if self.grids.is_none() {
            return 0.0;
        }
        self.grids().lpr.get_value(row, col)
    }

    pub fn set_lpr(&mut self, row: isize, col: isize, value: f64) {
        debug_assert!((0.0..=1.0).contains(&value), "lpr out of [0,1]: {}", value);
        self.grids_mut().lpr.set_value(row, col, value.clamp(0.0, 1.0));
    }

    pub fn sublab(&self, row: isize, col: isize) -> FineLabel {
        if self.grids.is_none() {
            return FineLabel::Unknown;
        }
        self.grids().sublab.get_value(row, col)
    }

    pub fn set_sublab(&mut self, row: isize, col: isize, value: FineLabel) {
        self.grids_mut().sublab.set_value(row, col, value);
    }

    pub fn groll(&self, row: isize, col: isize) -> f64 {
        if self.grids.is_none() {
            return 0.0;
        }
        self.grids().groll.get_value(row, col)
    }

    pub fn set_groll(&mut self, row: isize, col: isize, value: f64) {
        self.grids_mut().groll.set_value(row, col, value);
    }

    pub fn gpitch(&self, row: isize, col: isize) -> f64 {
        if self.grids.is_none() {
            return 0.0;
        }
        self.grids().gpitch.get_value(row, col)
    }

    pub fn set_gpitch(&mut self, row: isize, col: isize, value: f64) {
        self.grids_mut().gpitch.set_value(row, col, value);
    }

    pub fn centerline(&self, row: isize) -> CenterlineRow {
        if self.grids.is_none() || row < 0 || row >= self.length {
            return CenterlineRow::empty(self.width / 2);
        }
        self.grids().centerln[row as usize]
    }

    pub fn set_centerline(&mut self, row: isize, value: CenterlineRow) {
        if row < 0 || row >= self.length {
            return;
        }
        self.grids_mut().centerln[row as usize] = value;
    }

    /// Copies every per-cell field from `other` at `(src_row, src_col)`
    /// into `self` at `(dst_row, dst_col)`, including the coarse label.
    /// Used by the predictor (§4.2 step 4, empty target) and the fuser
    /// (§4.3, wholesale-copy paths).
    pub fn copy_cell_from(
        &mut self,
        dst_row: isize,
        dst_col: isize,
        other: &Dem,
        src_row: isize,
        src_col: isize,
    ) {
        self.set_demg(dst_row, dst_col, other.demg(src_row, src_col));
        self.set_demgnum(dst_row, dst_col, SaturatingCount::new(other.demgnum(src_row, src_col)));
        self.set_demhmin(dst_row, dst_col, other.demhmin(src_row, src_col));
        self.set_demhmax(dst_row, dst_col, other.demhmax(src_row, src_col));
        self.set_demhnum(dst_row, dst_col, SaturatingCount::new(other.demhnum(src_row, src_col)));
        self.set_lab(dst_row, dst_col, other.lab(src_row, src_col));
        self.set_lpr(dst_row, dst_col, other.lpr(src_row, src_col));
        self.set_sublab(dst_row, dst_col, other.sublab(src_row, src_col));
        self.set_groll(dst_row, dst_col, other.groll(src_row, src_col));
        self.set_gpitch(dst_row, dst_col, other.gpitch(src_row, src_col));
    }

    /// Copies everything (including `trans` and `dataon`) from `other`,
    /// allocating buffers if needed. Used to snapshot the global DEM into
    /// the scratch "temp" DEM at the start of prediction (§4.2).
    pub fn copy_all_from(&mut self, other: &Dem) {
        self.width = other.width;
        self.length = other.length;
        self.trans = other.trans;
        self.dataon = other.dataon;
        if let Some(other_grids) = other.grids.as_ref() {
            self.grids = Some(Grids {
                demg: other_grids.demg.duplicate(),
                demgnum: other_grids.demgnum.duplicate(),
                demhmin: other_grids.demhmin.duplicate(),
                demhmax: other_grids.demhmax.duplicate(),
                demhnum: other_grids.demhnum.duplicate(),
                lab: other_grids.lab.duplicate(),
                lpr: other_grids.lpr.duplicate(),
                sublab: other_grids.sublab.duplicate(),
                groll: other_grids.groll.duplicate(),
                gpitch: other_grids.gpitch.duplicate(),
                centerln: other_grids.centerln.clone(),
            });
        } else {
            self.grids = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_dem_is_empty_and_unallocated() {
        let dem = Dem::new(10, 10);
        assert!(!dem.dataon);
        assert!(!dem.is_allocated());
        // Reads on an unallocated DEM return sentinel defaults rather than panicking.
        assert_eq!(dem.demg(0, 0), INVALIDDOUBLE);
        assert_eq!(dem.lab(0, 0), CoarseLabel::Unknown);
    }

    #[test]
    fn test_zero_for_frame_allocates_and_resets() {
        let mut dem = Dem::new(10, 10);
        dem.zero_for_frame();
        assert!(dem.is_allocated());
        dem.set_demg(3, 3, 1.5);
        dem.set_lab(3, 3, CoarseLabel::Traversable);
        dem.zero_for_frame();
        assert_eq!(dem.demg(3, 3), INVALIDDOUBLE);
        assert_eq!(dem.lab(3, 3), CoarseLabel::Unknown);
    }

    #[test]
    fn test_release_drops_buffers() {
        let mut dem = Dem::new(5, 5);
        dem.zero_for_frame();
        assert!(dem.is_allocated());
        dem.release();
        assert!(!dem.is_allocated());
    }

    #[test]
    fn test_copy_cell_from_carries_all_fields() {
        let mut src = Dem::new(5, 5);
        src.zero_for_frame();
        src.set_demg(1, 1, 4.2);
        src.set_lab(1, 1, CoarseLabel::Traversable);
        src.set_lpr(1, 1, 0.75);

        let mut dst = Dem::new(5, 5);
        dst.zero_for_frame();
        dst.copy_cell_from(2, 2, &src, 1, 1);

        assert_eq!(dst.demg(2, 2), 4.2);
        assert_eq!(dst.lab(2, 2), CoarseLabel::Traversable);
        assert_eq!(dst.lpr(2, 2), 0.75);
    }
}
