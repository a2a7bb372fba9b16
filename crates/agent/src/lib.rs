//! Quote orchestration on top of `quoteline-core`.
//!
//! - `llm`: the generative-text capability, live (OpenAI-compatible) or deterministic
//! - `selector`: picks a catalog product and area estimate for free-text inquiries
//! - `composer`: renders the quote text, assisted or deterministic
//! - `runtime`: owns the guarded quote desk and carries out each transition's actions
//!
//! The assistant never decides prices. Totals always come from the core calculator;
//! the assistant only chooses a product and writes prose around fixed numbers.

pub mod audit;
pub mod composer;
pub mod llm;
pub mod runtime;
pub mod selector;
pub mod testing;

pub use audit::TracingAuditSink;
pub use composer::{ComposedQuote, CompositionMode, InquiryContext, QuoteBasis, QuoteComposer};
pub use llm::{generator_from_config, GeneratorMode, TextGenerator};
pub use runtime::{InquiryResponse, QuoteRuntime, ReplyResponse};
pub use selector::{AiSelection, ProductSelector, SelectionOutcome};
