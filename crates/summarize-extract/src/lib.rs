//! URL classification, HTML/article extraction, YouTube transcript
//! resolution, Firecrawl/Markdown fallbacks, and direct-media routing
//! (§4.4).

pub mod extractor;
pub mod firecrawl;
pub mod html;
pub mod markdown;
pub mod transcriber;
pub mod youtube;

pub use extractor::{Extractor, ExtractorConfig, MarkdownLlm};
pub use transcriber::{NoTranscriber, Transcriber};
