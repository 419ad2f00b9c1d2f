pub mod bootstrap;
pub mod error;
pub mod generator;
pub mod id_tracker;
pub mod metrics;
pub mod orchestrator;
pub mod pipeline;
pub mod session;
