//! Model identifiers, pricing, run-scoped cost bookkeeping, provider
//! adapters (Anthropic, OpenAI-compatible, mock), preset resolution, and
//! the refresh-free model ranker (§4.1, §4.2, §4.9).

pub mod anthropic;
pub mod costbook;
pub mod limits;
pub mod mock;
pub mod model_id;
pub mod openai;
pub mod pricing;
pub mod provider;
pub mod ranker;
pub mod registry;

pub use costbook::{CostBook, GroupTotals, render_cost};
pub use limits::ContextWindowTable;
pub use model_id::ModelId;
pub use pricing::PricingTable;
pub use provider::{GenerateRequest, GenerateResponse, LlmProvider, StreamDelta};
pub use ranker::{FreeCandidate, FreeModelProbe, RankerOptions, parse_catalog, rank};
pub use registry::ModelRegistry;
