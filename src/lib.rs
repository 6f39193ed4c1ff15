pub mod allocator;
pub mod bed;
pub mod catalogue;
pub mod config;
pub mod engine;
pub mod error;
pub mod events;
pub mod focus;
pub mod gain;
pub mod idle;
pub mod math;
pub mod playback;
pub mod pool;
pub mod ranker;
pub mod target;
pub mod world;

pub use allocator::{AllocationSummary, Allocator};
pub use bed::BackgroundBed;
pub use catalogue::{
    CatalogueSource, JsonCatalogueSource, Placement, SoundEntry, SoundsResponse, TargetSpec,
    select_targets,
};
pub use config::{ConfigurationResponse, SelectionMode, SonoConfig, WireConfiguration};
pub use engine::{DEFAULT_TICK_INTERVAL, SonoEngine};
pub use error::{Result, SonoError};
pub use events::SonoEvent;
pub use focus::{FocusSession, FocusState, FocusStateMachine};
pub use gain::GainModel;
pub use idle::{AimSample, IdleMonitor};
pub use math::Vec3;
pub use playback::{BedMode, PlaybackCommand};
pub use pool::{
    PlaybackResource, PoolCounts, Preparable, PrepareOutcome, PrepareTicket, ResourceId,
    ResourcePool, ResourceState,
};
pub use ranker::{angles_summary, rank};
pub use target::{SoundMetadata, SoundTarget, TargetId};
pub use world::SonoWorld;
