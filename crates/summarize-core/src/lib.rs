//! # summarize-core
//!
//! Shared vocabulary for the summarization pipeline: the data model (§3),
//! the unified error type (§7), and the `RuntimeContext` every other crate
//! threads through instead of reading globals.

pub mod error;
pub mod language;
pub mod merge;
pub mod message;
pub mod runtime;
pub mod types;

pub use error::{Error, Result};
pub use merge::{SseEvent, clean_for_display, merge_streaming_chunk};
pub use message::{Message, MessageContent, Role};
pub use runtime::RuntimeContext;
pub use types::*;
