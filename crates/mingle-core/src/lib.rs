pub mod agent;
pub mod config;
pub mod landscape;
pub mod render;
pub mod sector;
pub mod sequence;

pub use agent::{Agent, Temperament};
pub use config::{CandidatePolicy, SimConfig, SimConfigError};
pub use landscape::{Landscape, LandscapeError, StepReport};
pub use render::Surface;
pub use sector::{AgentHandle, SectorGrid, SectorGridError};
pub use sequence::{NodeId, SequenceContainer};
