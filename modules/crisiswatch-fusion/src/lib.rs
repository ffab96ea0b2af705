pub mod cache;
pub mod context;
pub mod engine;
pub mod orchestrator;
pub mod planner;

pub use cache::SingleflightCache;
pub use context::FusionContext;
pub use engine::{fuse, fuse_at};
pub use orchestrator::ModelOrchestrator;
pub use planner::{generate, PriorityTier};
