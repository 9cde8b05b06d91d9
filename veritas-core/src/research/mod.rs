//! The research pipeline: source registry, evidence aggregation, two-stage
//! synthesis, report assembly, and the session/engine entry points.

pub mod aggregator;
pub mod engine;
pub mod registry;
pub mod report;
pub mod session;
pub mod synthesis;

pub use aggregator::Aggregator;
pub use engine::ResearchEngine;
pub use registry::{SourceProvider, SourceRegistry};
pub use session::ResearchSession;
pub use synthesis::Synthesizer;
