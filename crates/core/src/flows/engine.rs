use serde::Serialize;

use crate::audit::{AuditCategory, AuditContext, AuditEvent, AuditOutcome, AuditSink};
use crate::correction::{CorrectionError, PriceCorrection};
use crate::cpq::{resolve, totalize, Catalog};
use crate::domain::product::Product;
use crate::domain::quote::{AmountOverflow, MissingItem, RequestedItem};
use crate::errors::DomainError;
use crate::flows::states::{DeskAction, DeskEvent, DeskState, PendingQuote, TransitionOutcome};

/// Catalog plus the single pending quote. Callers serialize access; every
/// method here runs one complete read-resolve-write step.
#[derive(Clone, Debug, Default)]
pub struct QuoteDesk {
    catalog: Catalog,
    pending: PendingQuote,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct DeskSnapshot {
    pub state: DeskState,
    pub pending_items: Vec<RequestedItem>,
    pub missing: Vec<MissingItem>,
    pub products: Vec<Product>,
}

impl QuoteDesk {
    pub fn new(catalog: Catalog) -> Self {
        Self { catalog, pending: PendingQuote::default() }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn pending(&self) -> &PendingQuote {
        &self.pending
    }

    pub fn state(&self) -> DeskState {
        self.pending.state()
    }

    pub fn snapshot(&self) -> DeskSnapshot {
        DeskSnapshot {
            state: self.state(),
            pending_items: self.pending.items.clone(),
            missing: self.pending.missing.clone(),
            products: self.catalog.products().to_vec(),
        }
    }

    /// Replaces whatever was pending; there is no queue and no merge. An
    /// inquiry whose totals cannot be represented leaves the desk untouched.
    pub fn submit(&mut self, items: Vec<RequestedItem>) -> Result<TransitionOutcome, DomainError> {
        if items.is_empty() {
            return Err(DomainError::InvalidInquiry("inquiry has no items".to_owned()));
        }

        let from = self.state();
        let resolution = resolve(&items, &self.catalog)?;
        let action = if resolution.is_complete() {
            let totals = totalize(&resolution.priced)?;
            self.pending.clear();
            DeskAction::ComposeQuote { priced: resolution.priced, totals }
        } else {
            self.pending = PendingQuote { items, missing: resolution.missing.clone() };
            DeskAction::RequestPrices { missing: resolution.missing }
        };

        Ok(TransitionOutcome {
            from,
            to: self.state(),
            event: DeskEvent::InquirySubmitted,
            actions: vec![action],
        })
    }

    /// The price is written even with nothing pending, so it is ready for later
    /// inquiries. The catalog write and the re-resolution of the pending quote
    /// commit together: a price that overflows the pending totals changes nothing.
    pub fn apply_price_correction(
        &mut self,
        correction: PriceCorrection,
    ) -> Result<TransitionOutcome, DomainError> {
        let from = self.state();
        let PriceCorrection { code, unit_price } = correction;
        let out_of_range =
            |_: AmountOverflow| CorrectionError::PriceOutOfRange { code: code.to_string() };

        let mut catalog = self.catalog.clone();
        catalog.set_price(code.clone(), unit_price);

        let follow_up = if from == DeskState::AwaitingPrices {
            let resolution = resolve(&self.pending.items, &catalog).map_err(out_of_range)?;
            if resolution.is_complete() {
                let totals = totalize(&resolution.priced).map_err(out_of_range)?;
                Some(DeskAction::ComposeQuote { priced: resolution.priced, totals })
            } else {
                Some(DeskAction::RemindMissingPrices { missing: resolution.missing })
            }
        } else {
            None
        };

        self.catalog = catalog;
        match &follow_up {
            Some(DeskAction::ComposeQuote { .. }) => self.pending.clear(),
            Some(DeskAction::RemindMissingPrices { missing }) => {
                self.pending.missing = missing.clone();
            }
            _ => {}
        }

        let mut actions = vec![DeskAction::ConfirmPrice { code: code.clone(), unit_price }];
        actions.extend(follow_up);
        Ok(TransitionOutcome {
            from,
            to: self.state(),
            event: DeskEvent::PriceCorrected(code),
            actions,
        })
    }

    /// Parses a raw reply body. A malformed reply leaves catalog and pending quote untouched.
    pub fn apply_reply(&mut self, body: &str) -> Result<TransitionOutcome, DomainError> {
        let correction = PriceCorrection::parse(body)?;
        self.apply_price_correction(correction)
    }
}

pub fn record_transition<S>(outcome: &TransitionOutcome, sink: &S, audit: &AuditContext)
where
    S: AuditSink + ?Sized,
{
    let event_type = match outcome.event {
        DeskEvent::InquirySubmitted => "quote.inquiry.transition_applied",
        DeskEvent::PriceCorrected(_) => "quote.correction.transition_applied",
    };
    let mut event = AuditEvent::new(audit, event_type, AuditCategory::Flow, AuditOutcome::Success)
        .with_metadata("from", format!("{:?}", outcome.from))
        .with_metadata("to", format!("{:?}", outcome.to))
        .with_metadata("actions", outcome.actions.len().to_string());
    if let DeskEvent::PriceCorrected(code) = &outcome.event {
        event = event.with_metadata("code", code.to_string());
    }
    sink.emit(event);
}
