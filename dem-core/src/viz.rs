use crate::dem::Dem;
use crate::labels::{CoarseLabel, FineLabel};

/// Renders a [`Dem`] into 8-bit visualization rasters (spec §6: `zmap`,
/// `lmap`, `pmap`, `smap`). Grounded on `whitebox_raster::Raster`'s
/// `row * columns + column` addressing — generalized here to one-byte
/// grayscale and three-byte RGB buffers instead of a full georeferenced
/// raster file, since these are rendering by-products, not a file format
/// this crate owns. Never consumed by [`crate::pipeline::DemPipeline`]
/// itself.
pub struct DemRenderer;

impl DemRenderer {
    /// Ground height (`demg`), linearly stretched between `z_min` and
    /// `z_max` into `0..=255`; cells with no ground observation render 0.
    pub fn zmap(dem: &Dem, z_min: f64, z_max: f64) -> Vec<u8> {
        let (width, length) = (dem.width, dem.length);
        let range = (z_max - z_min).max(f64::EPSILON);
        let mut buf = vec![0u8; (width * length) as usize];
        for y in 0..length {
            for x in 0..width {
                if dem.demgnum(y, x) > 0 {
                    let t = ((dem.demg(y, x) - z_min) / range).clamp(0.0, 1.0);
                    buf[(y * width + x) as usize] = (t * 255.0).round() as u8;
                }
            }
        }
        buf
    }

    /// Coarse label, one RGB triple per cell: unknown = black, traversable
    /// = green, non-traversable = red. Channel stride is `3` per pixel,
    /// computed explicitly (spec §6's note on `DrawDem`'s cosmetic
    /// 1-channel/3-channel stride mismatch, which this does not reproduce).
    pub fn lmap(dem: &Dem) -> Vec<u8> {
        let (width, length) = (dem.width, dem.length);
        let mut buf = vec![0u8; (width * length * 3) as usize];
        for y in 0..length {
            for x in 0..width {
                let offset = ((y * width + x) * 3) as usize;
                match dem.lab(y, x) {
                    CoarseLabel::Unknown => {}
                    CoarseLabel::Traversable => buf[offset + 1] = 255,
                    CoarseLabel::NonTraversable => buf[offset] = 255,
                }
            }
        }
        buf
    }

    /// Confidence (`lpr`), already in `[0,1]`, scaled directly to `0..=255`.
    pub fn pmap(dem: &Dem) -> Vec<u8> {
        let (width, length) = (dem.width, dem.length);
        let mut buf = vec![0u8; (width * length) as usize];
        for y in 0..length {
            for x in 0..width {
                buf[(y * width + x) as usize] = (dem.lpr(y, x) * 255.0).round() as u8;
            }
        }
        buf
    }

    /// Fine sub-label, one byte per cell with a fixed palette index.
    pub fn smap(dem: &Dem) -> Vec<u8> {
        let (width, length) = (dem.width, dem.length);
        let mut buf = vec![0u8; (width * length) as usize];
        for y in 0..length {
            for x in 0..width {
                buf[(y * width + x) as usize] = Self::sublab_index(dem.sublab(y, x));
            }
        }
        buf
    }

    fn sublab_index(label: FineLabel) -> u8 {
        match label {
            FineLabel::Unknown => 0,
            FineLabel::FlatGround => 1,
            FineLabel::Upslope => 2,
            FineLabel::Downslope => 3,
            FineLabel::LeftSideSlope => 4,
            FineLabel::RightSideSlope => 5,
            FineLabel::EdgePoints => 6,
            FineLabel::PositiveObstacle => 7,
            FineLabel::NegativeObstacle => 8,
        }
    }
}
