use serde::{Deserialize, Serialize};

use crate::error::DemError;

/// The named constants of spec §6, grouped into one settings struct in the
/// style of `whitebox_common::configs::Configs` — a `serde`-backed struct
/// with a `::new()` default, loadable/saveable as JSON. Unlike the
/// teacher's `Configs`, this has no notion of an executable-relative
/// `settings.json` (there is no CLI binary in this crate's scope), so
/// load/save work against an in-memory string rather than a file next to
/// the running executable.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    /// Raster width, in meters, centered on the vehicle.
    pub wid_siz: f64,
    /// Raster length, in meters, centered on the vehicle.
    pub len_siz: f64,
    /// Square cell size, in meters.
    pub pix_siz: f64,
    /// Minimum obstacle height the vehicle cannot straddle, in meters.
    pub pos_obs_min_height: f64,
    /// Sensor mounting height above the road plane, in meters.
    pub vehicle_height: f64,
    /// Radius, in meters, of the blind ring around the vehicle exempt from
    /// obstacle classification.
    pub near_vehicle_dis: f64,
    /// Vertical FOV upper bound, in radians.
    pub vmax_ang: f64,
    /// Vertical FOV lower bound, in radians.
    pub vmin_ang: f64,
    /// Number of LiDAR rings spanning `vmax_ang..vmin_ang`.
    pub num_rings: usize,
    /// Cap on the number of OS threads rayon may use for the row-parallel
    /// stages (§5). `-1` means "use all available".
    pub max_procs: isize,
}

pub const INVALIDDOUBLE: f64 = -9999.0;

impl PipelineConfig {
    pub fn new() -> PipelineConfig {
        PipelineConfig {
            wid_siz: 60.0,
            len_siz: 120.0,
            pix_siz: 0.2,
            pos_obs_min_height: 0.3,
            vehicle_height: 2.0,
            near_vehicle_dis: 2.5,
            vmax_ang: 2.0_f64.to_radians(),
            vmin_ang: -24.8_f64.to_radians(),
            num_rings: 64,
            max_procs: -1,
        }
    }

    pub fn width_cells(&self) -> isize {
        (self.wid_siz / self.pix_siz).round() as isize
    }

    pub fn length_cells(&self) -> isize {
        (self.len_siz / self.pix_siz).round() as isize
    }

    /// Thread count for the row-parallel stages (§4.1-4.3), following
    /// `whitebox_tools_app`'s `num_procs`/`max_procs` clamp (e.g.
    /// `reclass.rs`): start from the available core count and clamp it
    /// down if `max_procs` names a smaller positive cap.
    pub fn thread_pool_size(&self) -> usize {
        let mut num_procs = num_cpus::get() as isize;
        if self.max_procs > 0 && self.max_procs < num_procs {
            num_procs = self.max_procs;
        }
        num_procs.max(1) as usize
    }

    pub fn validate(&self) -> Result<(), DemError> {
        if self.pix_siz <= 0.0 {
            return Err(DemError::InvalidCellSize(self.pix_siz));
        }
        let (w, l) = (self.width_cells(), self.length_cells());
        if w <= 0 || l <= 0 {
            return Err(DemError::InvalidGridDimensions { width: w, length: l });
        }
        Ok(())
    }

    pub fn from_json(s: &str) -> serde_json::Result<PipelineConfig> {
        serde_json::from_str(s)
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        PipelineConfig::new()
    }
}

/// Ambient logging level, threaded through [`crate::pipeline::PipelineContext`]
/// in place of the `log`/`tracing` crates the teacher pack does not use —
/// it gates `println!`/`eprintln!` calls the same way the teacher's
/// `verbose: bool` flag does (e.g. `lidar_ground_point_filter.rs`).
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum Verbosity {
    Quiet,
    Normal,
    Verbose,
}

impl Verbosity {
    pub fn is_verbose(&self) -> bool {
        matches!(self, Verbosity::Verbose)
    }
}
