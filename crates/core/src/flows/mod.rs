pub mod engine;
pub mod states;

pub use engine::{record_transition, DeskSnapshot, QuoteDesk};
pub use states::{DeskAction, DeskEvent, DeskState, PendingQuote, TransitionOutcome};
