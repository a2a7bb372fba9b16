use std::sync::Arc;

use quoteline_core::config::PricingConfig;
use quoteline_core::cpq::price_area;
use quoteline_core::flows::record_transition;
use quoteline_core::notices;
use quoteline_core::{
    ApplicationError, AuditCategory, AuditContext, AuditEvent, AuditOutcome, AuditSink, Catalog,
    DeskAction, DeskSnapshot, DeskState, DomainError, MissingItem, NoticeKind, OutboundMessage,
    PriceCorrection, Product, ProductCode, QuoteDesk, QuoteTotals, ReplyChannel, RequestedItem,
    TransitionOutcome,
};
use rust_decimal::Decimal;
use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::composer::{CompositionMode, InquiryContext, QuoteBasis, QuoteComposer};
use crate::llm::{GeneratorMode, TextGenerator};
use crate::selector::{ProductSelector, SelectionOutcome};

const EXCERPT_CHARS: usize = 400;

/// Response to an inquiry, tagged by `status` on the wire.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum InquiryResponse {
    WaitingForPrices {
        missing_codes: Vec<ProductCode>,
        missing: Vec<MissingItem>,
    },
    QuoteReady {
        quote_text: String,
        totals: QuoteTotals,
        composition: CompositionMode,
    },
    Apology {
        reason: String,
        rationale: String,
    },
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ReplyResponse {
    PriceRecorded {
        code: ProductCode,
        unit_price: Decimal,
        state: DeskState,
        missing_codes: Vec<ProductCode>,
    },
    QuoteReady {
        code: ProductCode,
        unit_price: Decimal,
        quote_text: String,
        totals: QuoteTotals,
        composition: CompositionMode,
    },
    Rejected {
        reason: String,
    },
}

/// Desk plus the context of the inquiry it is waiting on, guarded together.
struct DeskSlot {
    desk: QuoteDesk,
    pending_context: InquiryContext,
}

struct Composed {
    text: String,
    totals: QuoteTotals,
    mode: CompositionMode,
}

/// Owns the quote desk and drives its transitions. The lock is held for the
/// read-resolve-write step only; composition and delivery run after release.
pub struct QuoteRuntime {
    slot: Mutex<DeskSlot>,
    selector: ProductSelector,
    composer: QuoteComposer,
    channel: Arc<dyn ReplyChannel>,
    audit: Arc<dyn AuditSink>,
    labor_rate: Decimal,
    generator_mode: GeneratorMode,
}

impl QuoteRuntime {
    pub fn new(
        catalog: Catalog,
        generator: Arc<dyn TextGenerator>,
        channel: Arc<dyn ReplyChannel>,
        audit: Arc<dyn AuditSink>,
        pricing: &PricingConfig,
    ) -> Self {
        Self {
            slot: Mutex::new(DeskSlot {
                desk: QuoteDesk::new(catalog),
                pending_context: InquiryContext::default(),
            }),
            selector: ProductSelector::new(generator.clone(), pricing.default_area_estimate),
            generator_mode: generator.mode(),
            composer: QuoteComposer::new(generator),
            channel,
            audit,
            labor_rate: pricing.labor_rate,
        }
    }

    pub fn generator_mode(&self) -> GeneratorMode {
        self.generator_mode
    }

    pub fn channel_name(&self) -> &'static str {
        self.channel.name()
    }

    pub async fn snapshot(&self) -> DeskSnapshot {
        self.slot.lock().await.desk.snapshot()
    }

    pub async fn products(&self) -> Vec<Product> {
        self.slot.lock().await.desk.catalog().products().to_vec()
    }

    /// Explicit line items. Either composes and delivers a quote or parks the
    /// inquiry and asks for the missing prices.
    pub async fn submit_items(
        &self,
        items: Vec<RequestedItem>,
        context: InquiryContext,
        audit: &AuditContext,
    ) -> Result<InquiryResponse, ApplicationError> {
        info!(
            event_name = "quote.inquiry.submitted",
            correlation_id = %audit.correlation_id,
            items = items.len(),
            "inquiry received"
        );

        let outcome = {
            let mut slot = self.slot.lock().await;
            let outcome = match slot.desk.submit(items) {
                Ok(outcome) => outcome,
                Err(error) => {
                    self.reject_inquiry(&error, audit);
                    return Err(error.into());
                }
            };
            slot.pending_context = match outcome.to {
                DeskState::AwaitingPrices => context.clone(),
                DeskState::Empty => InquiryContext::default(),
            };
            outcome
        };
        record_transition(&outcome, self.audit.as_ref(), audit);

        let response = match self.execute(&outcome, &context, audit).await {
            Some(composed) => InquiryResponse::QuoteReady {
                quote_text: composed.text,
                totals: composed.totals,
                composition: composed.mode,
            },
            None => {
                let missing = requested_missing(&outcome);
                InquiryResponse::WaitingForPrices {
                    missing_codes: missing.iter().map(|item| item.code.clone()).collect(),
                    missing,
                }
            }
        };
        Ok(response)
    }

    /// Free-text inquiry: the assistant picks a product and an area, which is
    /// priced as material plus labor. The pending quote is not involved.
    pub async fn submit_text(
        &self,
        text: &str,
        subject: Option<String>,
        audit: &AuditContext,
    ) -> Result<InquiryResponse, ApplicationError> {
        let text = text.trim();
        if text.is_empty() {
            let error = DomainError::InvalidInquiry("inquiry text is empty".to_owned());
            self.reject_inquiry(&error, audit);
            return Err(error.into());
        }
        info!(
            event_name = "quote.inquiry.submitted",
            correlation_id = %audit.correlation_id,
            chars = text.len(),
            "free-text inquiry received"
        );

        let products = self.products().await;
        let outcome = self.selector.select_outcome(text, &products).await;
        let selection_outcome = match outcome {
            SelectionOutcome::Parsed(_) => AuditOutcome::Success,
            SelectionOutcome::Unparsed(_) | SelectionOutcome::Default(_) => AuditOutcome::Degraded,
        };
        let kind = outcome.kind();
        let selection = outcome.into_selection(self.selector.default_area());
        let selected_code =
            selection.product_code.as_ref().map(ToString::to_string).unwrap_or_default();
        self.audit.emit(
            AuditEvent::new(
                audit,
                "quote.selection.completed",
                AuditCategory::Selection,
                selection_outcome,
            )
            .with_metadata("kind", kind)
            .with_metadata("product_code", selected_code)
            .with_metadata("area_estimate", selection.area_estimate.to_string()),
        );

        let product = selection
            .product_code
            .as_ref()
            .and_then(|code| products.iter().find(|product| &product.code == code));
        let Some(product) = product else {
            let reason = match &selection.product_code {
                Some(code) => format!("product {code} is not in the catalog"),
                None => "no matching product was identified".to_owned(),
            };
            warn!(
                event_name = "quote.selection.unresolved",
                correlation_id = %audit.correlation_id,
                reason = %reason,
                "sending apology instead of a quote"
            );
            self.deliver(NoticeKind::Apology, notices::apology(&reason), audit).await;
            return Ok(InquiryResponse::Apology { reason, rationale: selection.rationale });
        };

        let area = match price_area(product, selection.area_estimate, self.labor_rate) {
            Ok(area) => area,
            Err(error) => {
                let reason = format!("the area estimate for {} cannot be priced", product.code);
                warn!(
                    event_name = "quote.area.rejected",
                    correlation_id = %audit.correlation_id,
                    code = %product.code,
                    area_estimate = %selection.area_estimate,
                    error = %error,
                    "sending apology instead of a quote"
                );
                self.audit.emit(
                    AuditEvent::new(
                        audit,
                        "quote.area.rejected",
                        AuditCategory::Pricing,
                        AuditOutcome::Rejected,
                    )
                    .with_metadata("product_code", product.code.to_string())
                    .with_metadata("area_estimate", selection.area_estimate.to_string()),
                );
                self.deliver(NoticeKind::Apology, notices::apology(&reason), audit).await;
                return Ok(InquiryResponse::Apology { reason, rationale: selection.rationale });
            }
        };
        self.audit.emit(
            AuditEvent::new(
                audit,
                "quote.area.priced",
                AuditCategory::Pricing,
                AuditOutcome::Success,
            )
            .with_metadata("product_code", area.code.to_string())
            .with_metadata("area", area.area.to_string())
            .with_metadata("total", area.totals.total.to_string()),
        );
        let totals = area.totals.clone();
        let context = InquiryContext {
            subject,
            excerpt: Some(text.chars().take(EXCERPT_CHARS).collect()),
            rationale: Some(selection.rationale).filter(|value| !value.is_empty()),
            pricing_notes: Some(selection.pricing_notes).filter(|value| !value.is_empty()),
        };
        let composed = self.compose(QuoteBasis::Area(area), totals, &context, audit).await;

        Ok(InquiryResponse::QuoteReady {
            quote_text: composed.text,
            totals: composed.totals,
            composition: composed.mode,
        })
    }

    /// One reply-channel message, read as a `CODE=PRICE` correction. A malformed
    /// body is answered over the channel and leaves all state untouched.
    pub async fn handle_reply(&self, body: &str, audit: &AuditContext) -> ReplyResponse {
        let correction = match PriceCorrection::parse(body) {
            Ok(correction) => correction,
            Err(error) => return self.reject_reply(&DomainError::from(error), audit).await,
        };
        let PriceCorrection { code, unit_price } = correction.clone();

        let applied = {
            let mut slot = self.slot.lock().await;
            match slot.desk.apply_price_correction(correction) {
                Ok(outcome) => {
                    let context = if outcome.composed_quote().is_some() {
                        std::mem::take(&mut slot.pending_context)
                    } else {
                        slot.pending_context.clone()
                    };
                    Ok((outcome, context))
                }
                Err(error) => Err(error),
            }
        };

        let (outcome, context) = match applied {
            Ok(applied) => applied,
            Err(error) => return self.reject_reply(&error, audit).await,
        };

        info!(
            event_name = "quote.correction.applied",
            correlation_id = %audit.correlation_id,
            code = %code,
            unit_price = %unit_price,
            state = ?outcome.to,
            "price correction applied"
        );
        record_transition(&outcome, self.audit.as_ref(), audit);

        match self.execute(&outcome, &context, audit).await {
            Some(composed) => ReplyResponse::QuoteReady {
                code,
                unit_price,
                quote_text: composed.text,
                totals: composed.totals,
                composition: composed.mode,
            },
            None => ReplyResponse::PriceRecorded {
                code,
                unit_price,
                state: outcome.to,
                missing_codes: outcome
                    .actions
                    .iter()
                    .find_map(|action| match action {
                        DeskAction::RemindMissingPrices { missing } => Some(missing),
                        _ => None,
                    })
                    .map(|missing| missing.iter().map(|item| item.code.clone()).collect())
                    .unwrap_or_default(),
            },
        }
    }

    /// Performs the transition's actions in order. Returns the composed quote, if any.
    async fn execute(
        &self,
        outcome: &TransitionOutcome,
        context: &InquiryContext,
        audit: &AuditContext,
    ) -> Option<Composed> {
        let mut composed = None;
        for action in &outcome.actions {
            match action {
                DeskAction::ConfirmPrice { code, unit_price } => {
                    let body = notices::price_confirmation(code, *unit_price);
                    self.deliver(NoticeKind::PriceConfirmation, body, audit).await;
                }
                DeskAction::RequestPrices { missing } => {
                    info!(
                        event_name = "quote.prices.requested",
                        correlation_id = %audit.correlation_id,
                        missing = missing.len(),
                        "requesting missing prices"
                    );
                    self.deliver(NoticeKind::PriceRequest, notices::price_request(missing), audit)
                        .await;
                }
                DeskAction::RemindMissingPrices { missing } => {
                    self.deliver(NoticeKind::PriceReminder, notices::price_reminder(missing), audit)
                        .await;
                }
                DeskAction::ComposeQuote { priced, totals } => {
                    let basis = QuoteBasis::Items(priced.clone());
                    composed = Some(self.compose(basis, totals.clone(), context, audit).await);
                }
            }
        }
        composed
    }

    async fn compose(
        &self,
        basis: QuoteBasis,
        totals: QuoteTotals,
        context: &InquiryContext,
        audit: &AuditContext,
    ) -> Composed {
        let quote = self.composer.compose(&basis, &totals, context).await;
        let outcome = match quote.mode {
            CompositionMode::Assisted => AuditOutcome::Success,
            CompositionMode::Fallback => AuditOutcome::Degraded,
        };
        info!(
            event_name = "quote.composed",
            correlation_id = %audit.correlation_id,
            mode = ?quote.mode,
            total = %totals.total,
            "quote composed"
        );
        self.audit.emit(
            AuditEvent::new(audit, "quote.composed", AuditCategory::Composition, outcome)
                .with_metadata("lines", basis_lines(&basis).to_string())
                .with_metadata("total", totals.total.to_string()),
        );

        self.deliver(NoticeKind::QuoteReady, notices::quote_ready(&quote.text), audit).await;
        Composed { text: quote.text, totals, mode: quote.mode }
    }

    /// Delivery never fails the operation; the quote counts as done once composed.
    async fn deliver(&self, kind: NoticeKind, body: String, audit: &AuditContext) {
        let message = OutboundMessage::new(kind, body, audit.correlation_id.clone());
        let event = match self.channel.send(&message).await {
            Ok(receipt) => {
                debug!(
                    event_name = "delivery.sent",
                    correlation_id = %audit.correlation_id,
                    channel = %receipt.channel,
                    kind = ?kind,
                    "notice delivered"
                );
                AuditEvent::new(
                    audit,
                    "delivery.sent",
                    AuditCategory::Delivery,
                    AuditOutcome::Success,
                )
                .with_metadata("channel", receipt.channel)
                .with_metadata("reference", receipt.reference.unwrap_or_default())
            }
            Err(error) => {
                warn!(
                    event_name = "delivery.failed",
                    correlation_id = %audit.correlation_id,
                    channel = self.channel.name(),
                    kind = ?kind,
                    error = %error,
                    "notice could not be delivered"
                );
                AuditEvent::new(
                    audit,
                    "delivery.failed",
                    AuditCategory::Delivery,
                    AuditOutcome::Failed,
                )
                .with_metadata("channel", self.channel.name())
                .with_metadata("error", error.to_string())
            }
        };
        self.audit.emit(event.with_metadata("kind", format!("{kind:?}")));
    }

    fn reject_inquiry(&self, error: &DomainError, audit: &AuditContext) {
        warn!(
            event_name = "quote.inquiry.rejected",
            correlation_id = %audit.correlation_id,
            error = %error,
            "inquiry rejected"
        );
        self.audit.emit(
            AuditEvent::new(
                audit,
                "quote.inquiry.rejected",
                AuditCategory::Ingress,
                AuditOutcome::Rejected,
            )
            .with_metadata("reason", error.to_string()),
        );
    }

    async fn reject_reply(&self, error: &DomainError, audit: &AuditContext) -> ReplyResponse {
        warn!(
            event_name = "quote.correction.rejected",
            correlation_id = %audit.correlation_id,
            error = %error,
            "price correction rejected"
        );
        self.audit.emit(
            AuditEvent::new(
                audit,
                "quote.correction.rejected",
                AuditCategory::Ingress,
                AuditOutcome::Rejected,
            )
            .with_metadata("reason", error.to_string()),
        );

        let body = match error {
            DomainError::MalformedCorrection(correction) => {
                notices::correction_rejected(correction)
            }
            other => other.to_string(),
        };
        self.deliver(NoticeKind::CorrectionRejected, body, audit).await;
        ReplyResponse::Rejected { reason: error.to_string() }
    }
}

fn requested_missing(outcome: &TransitionOutcome) -> Vec<MissingItem> {
    outcome
        .actions
        .iter()
        .find_map(|action| match action {
            DeskAction::RequestPrices { missing } => Some(missing.clone()),
            _ => None,
        })
        .unwrap_or_default()
}

fn basis_lines(basis: &QuoteBasis) -> usize {
    match basis {
        QuoteBasis::Items(items) => items.len(),
        QuoteBasis::Area(_) => 2,
    }
}
