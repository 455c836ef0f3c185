pub mod centerline;
pub mod config;
pub mod dem;
pub mod error;
pub mod fuse;
pub mod labels;
pub mod local_dem;
pub mod obstacle;
pub mod pipeline;
pub mod plane_fit;
pub mod pose;
pub mod predict;
pub mod range_view;
pub mod road_surface;
pub mod viz;

pub use centerline::CenterlineExtractor;
pub use config::{PipelineConfig, Verbosity, INVALIDDOUBLE};
pub use dem::{CenterlineRow, Dem};
pub use error::DemError;
pub use fuse::GlobalDemFuser;
pub use labels::{CoarseLabel, FineLabel};
pub use local_dem::LocalDemBuilder;
pub use obstacle::ObstacleSublabeler;
pub use pipeline::{DemPipeline, PipelineContext};
pub use plane_fit::PlaneFit;
pub use pose::Pose;
pub use predict::GlobalDemPredictor;
pub use range_view::{RangePoint, RangeView, RegionSegment};
pub use road_surface::RoadSurfaceSublabeler;
pub use viz::DemRenderer;
