//! Quote resolution engine: catalog, line-item resolution, totals and the
//! pending-quote state machine that waits for missing prices.

pub mod audit;
pub mod config;
pub mod correction;
pub mod cpq;
pub mod delivery;
pub mod domain;
pub mod errors;
pub mod flows;
pub mod notices;

pub use audit::{AuditCategory, AuditContext, AuditEvent, AuditOutcome, AuditSink};
pub use correction::{CorrectionError, PriceCorrection};
pub use cpq::{Catalog, Resolution};
pub use delivery::{
    DeliveryError, DeliveryReceipt, NoticeKind, OutboundMessage, RecordingChannel, ReplyChannel,
};
pub use domain::product::{Product, ProductCode};
pub use domain::quote::{AmountOverflow, MissingItem, PricedItem, QuoteTotals, RequestedItem};
pub use errors::{ApplicationError, DomainError, InterfaceError};
pub use flows::{DeskAction, DeskEvent, DeskSnapshot, DeskState, QuoteDesk, TransitionOutcome};
