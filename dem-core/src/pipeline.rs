use crate::centerline::CenterlineExtractor;
use crate::config::{PipelineConfig, Verbosity};
use crate::dem::Dem;
use crate::fuse::GlobalDemFuser;
use crate::local_dem::LocalDemBuilder;
use crate::obstacle::ObstacleSublabeler;
use crate::pose::Pose;
use crate::predict::GlobalDemPredictor;
use crate::range_view::RangeView;
use crate::road_surface::RoadSurfaceSublabeler;

/// Owns the three DEM instances and the configuration the pipeline runs
/// against, grouping what would otherwise be process-global mutable state
/// (`rm`, `dm`, `gm`, `ggm` in `examples/original_source/main.cpp`) into
/// one explicit value threaded through every call (spec §9).
pub struct PipelineContext {
    pub local: Dem,
    pub global: Dem,
    scratch: Dem,
    pub cfg: PipelineConfig,
    pub verbosity: Verbosity,
    pool: rayon::ThreadPool,
}

impl PipelineContext {
    pub fn new(cfg: PipelineConfig, verbosity: Verbosity) -> PipelineContext {
        let (width, length) = (cfg.width_cells(), cfg.length_cells());
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(cfg.thread_pool_size())
            .build()
            .expect("failed to build the DEM pipeline's rayon thread pool");
        PipelineContext {
            local: Dem::new(width, length),
            global: Dem::new(width, length),
            scratch: Dem::new(width, length),
            cfg,
            verbosity,
            pool,
        }
    }
}

/// Runs the seven-stage per-frame pipeline in the strict order spec §5
/// requires: each later stage depends on a buffer the previous stage just
/// wrote (fuse needs the predicted `global`, centerline needs the fused
/// `global`, road-surface and obstacle both need `centerln`).
pub struct DemPipeline;

impl DemPipeline {
    pub fn process_frame(ctx: &mut PipelineContext, view: &RangeView, pose: Pose) {
        if ctx.verbosity.is_verbose() {
            println!("processing frame at pose ang={:.3} shv=({:.2}, {:.2})", pose.ang, pose.shv.x, pose.shv.y);
        }

        // §4.1-4.3 shard their row-independent work across ctx.pool; §4.4
        // and §4.6 run on the calling thread regardless (spec §5).
        let local = &mut ctx.local;
        let global = &mut ctx.global;
        let scratch = &mut ctx.scratch;
        let cfg = &ctx.cfg;
        ctx.pool.install(|| {
            LocalDemBuilder::build(local, view, pose, cfg);
            GlobalDemPredictor::predict(global, scratch, pose, cfg);
            GlobalDemFuser::fuse(global, local, cfg);
        });

        CenterlineExtractor::extract(&mut ctx.global, &ctx.cfg);
        RoadSurfaceSublabeler::sublabel(&mut ctx.global);
        ObstacleSublabeler::sublabel(&mut ctx.global, &ctx.cfg);

        if ctx.verbosity.is_verbose() {
            println!("frame complete");
        }
    }

    /// Releases every DEM's buffers, as done at process shutdown (spec §5).
    pub fn shutdown(ctx: &mut PipelineContext) {
        ctx.local.release();
        ctx.global.release();
        ctx.scratch.release();
    }
}
