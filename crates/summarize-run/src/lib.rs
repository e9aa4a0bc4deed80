//! The run-flow orchestrator (§4.7): resolves language, classifies input,
//! drives the extractor and (optionally, in parallel) the slides
//! pipeline, builds and issues the summary prompt with map-reduce
//! chunking, and reports cost. [`RunRegistry`] is the daemon-facing
//! lifecycle + event log each run is tracked under (§3 `Run`, §4.6).

pub mod orchestrator;
pub mod run_registry;

pub use orchestrator::{Orchestrator, ProviderResolver, RegistryResolver, RunOptions, RunOutcome};
pub use run_registry::RunRegistry;
