//! Two caching layers for the summarization pipeline (§4.3):
//!
//! - [`metadata`]: a SQLite-backed store for transcripts, extracted
//!   content, summaries, and slide manifests, keyed by the deterministic
//!   fingerprints in [`key`].
//! - [`media`]: a file-backed store for downloaded binary assets (audio,
//!   video, PDFs), indexed by an atomically-rewritten `index.json`.
//!
//! Both layers sweep expired entries and enforce their configured byte
//! cap on every access; neither ever grows unbounded.

pub mod key;
pub mod media;
pub mod metadata;

pub use key::{content_hash, content_key, slides_key, summary_key, transcript_key, url_hash};
pub use media::MediaCache;
pub use metadata::{CacheStats, MetadataCache, Namespace};
