use std::sync::Arc;

use quoteline_core::cpq::{AreaQuote, VAT_RATE};
use quoteline_core::{PricedItem, QuoteTotals};
use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::{json, Value};
use tracing::warn;

use crate::llm::{GenerationError, GenerationRequest, ResponseFormat, TextGenerator};

const COMPOSER_SYSTEM_ROLE: &str =
    "You are a courteous salesperson who writes short, clear price quotes.";

const COMPOSER_INSTRUCTION: &str = concat!(
    "Write a quote email for the customer from the data below. ",
    "Be professional but personable, address the customer formally, summarize the items ",
    "and finish with the TOTAL price including VAT."
);

/// What the quote prices: explicit line items, or one product over an estimated area.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum QuoteBasis {
    Items(Vec<PricedItem>),
    Area(AreaQuote),
}

/// Optional inquiry details passed through to the assisted brief.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct InquiryContext {
    pub subject: Option<String>,
    pub excerpt: Option<String>,
    pub rationale: Option<String>,
    pub pricing_notes: Option<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CompositionMode {
    Assisted,
    Fallback,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ComposedQuote {
    pub text: String,
    pub mode: CompositionMode,
}

pub struct QuoteComposer {
    generator: Arc<dyn TextGenerator>,
}

impl QuoteComposer {
    pub fn new(generator: Arc<dyn TextGenerator>) -> Self {
        Self { generator }
    }

    pub async fn compose(
        &self,
        basis: &QuoteBasis,
        totals: &QuoteTotals,
        context: &InquiryContext,
    ) -> ComposedQuote {
        let request = GenerationRequest {
            system: COMPOSER_SYSTEM_ROLE.to_owned(),
            instruction: COMPOSER_INSTRUCTION.to_owned(),
            context: brief(basis, totals, context),
            format: ResponseFormat::Text,
        };

        match self.generator.generate(&request).await {
            Ok(text) if !text.trim().is_empty() => {
                ComposedQuote { text, mode: CompositionMode::Assisted }
            }
            Ok(_) => {
                warn!(event_name = "composer.empty_reply", "assistant returned empty prose");
                fallback(basis, totals)
            }
            Err(GenerationError::NotConfigured) => fallback(basis, totals),
            Err(error) => {
                warn!(
                    event_name = "composer.generation_failed",
                    error = %error,
                    "assistant unavailable; composing deterministic quote"
                );
                fallback(basis, totals)
            }
        }
    }
}

fn fallback(basis: &QuoteBasis, totals: &QuoteTotals) -> ComposedQuote {
    ComposedQuote { text: fallback_text(basis, totals), mode: CompositionMode::Fallback }
}

fn money(amount: Decimal) -> String {
    format!("{amount:.2}")
}

/// Deterministic quote: one line per item, then the totals.
pub fn fallback_text(basis: &QuoteBasis, totals: &QuoteTotals) -> String {
    let lines = match basis {
        QuoteBasis::Items(items) => items
            .iter()
            .map(|item| {
                format!("{} x {} pcs = {}", item.code, item.quantity, money(item.line_total))
            })
            .collect::<Vec<_>>(),
        QuoteBasis::Area(area) => vec![
            format!(
                "{} ({}) x {} {} = {}",
                area.code,
                area.product_name,
                area.area,
                area.unit,
                money(area.material)
            ),
            format!("Labor x {} {} = {}", area.area, area.unit, money(area.labor)),
        ],
    };

    format!(
        "(generated without assistant)\nItems:\n{}\n\nSubtotal: {}\nVAT {}%: {}\nTotal incl. VAT: {}",
        lines.join("\n"),
        money(totals.subtotal),
        (VAT_RATE * Decimal::ONE_HUNDRED).normalize(),
        money(totals.tax),
        money(totals.total)
    )
}

fn brief(basis: &QuoteBasis, totals: &QuoteTotals, context: &InquiryContext) -> Value {
    let items = match basis {
        QuoteBasis::Items(items) => items
            .iter()
            .map(|item| {
                json!({
                    "code": item.code,
                    "quantity": item.quantity,
                    "unit": "pcs",
                    "unit_price": money(item.unit_price),
                    "line_total": money(item.line_total),
                })
            })
            .collect::<Vec<_>>(),
        QuoteBasis::Area(area) => vec![
            json!({
                "code": area.code,
                "name": area.product_name,
                "quantity": area.area.to_string(),
                "unit": area.unit,
                "unit_price": money(area.price_per_unit),
                "line_total": money(area.material),
            }),
            json!({
                "code": "LABOR",
                "quantity": area.area.to_string(),
                "unit": area.unit,
                "unit_price": money(area.labor_rate),
                "line_total": money(area.labor),
            }),
        ],
    };

    json!({
        "items": items,
        "subtotal": money(totals.subtotal),
        "vat_rate": VAT_RATE.to_string(),
        "tax": money(totals.tax),
        "total_incl_vat": money(totals.total),
        "inquiry": context,
    })
}
