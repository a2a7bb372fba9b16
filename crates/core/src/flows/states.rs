use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::product::ProductCode;
use crate::domain::quote::{MissingItem, PricedItem, QuoteTotals, RequestedItem};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeskState {
    Empty,
    AwaitingPrices,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeskEvent {
    InquirySubmitted,
    PriceCorrected(ProductCode),
}

/// Side effects the caller performs after a transition, in order.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeskAction {
    ConfirmPrice { code: ProductCode, unit_price: Decimal },
    RequestPrices { missing: Vec<MissingItem> },
    RemindMissingPrices { missing: Vec<MissingItem> },
    ComposeQuote { priced: Vec<PricedItem>, totals: QuoteTotals },
}

/// The single in-flight quote. `missing` is only ever written from a fresh
/// resolution of `items` against the catalog.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingQuote {
    pub(crate) items: Vec<RequestedItem>,
    pub(crate) missing: Vec<MissingItem>,
}

impl PendingQuote {
    pub fn items(&self) -> &[RequestedItem] {
        &self.items
    }

    pub fn missing(&self) -> &[MissingItem] {
        &self.missing
    }

    pub fn state(&self) -> DeskState {
        if self.missing.is_empty() {
            DeskState::Empty
        } else {
            DeskState::AwaitingPrices
        }
    }

    pub(crate) fn clear(&mut self) {
        self.items.clear();
        self.missing.clear();
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionOutcome {
    pub from: DeskState,
    pub to: DeskState,
    pub event: DeskEvent,
    pub actions: Vec<DeskAction>,
}

impl TransitionOutcome {
    pub fn composed_quote(&self) -> Option<(&[PricedItem], &QuoteTotals)> {
        self.actions.iter().find_map(|action| match action {
            DeskAction::ComposeQuote { priced, totals } => Some((priced.as_slice(), totals)),
            _ => None,
        })
    }
}
