//! HTTP surface.
//!
//! - `GET  /`                 index page: catalog, pending quote, demo link
//! - `GET  /health`           generator and channel readiness
//! - `GET  /catalog`          catalog snapshot (JSON)
//! - `GET  /trigger_example`  submits the built-in demo inquiry
//! - `POST /inquiries`        explicit line items
//! - `POST /inquiries/text`   free-text inquiry, priced by area
//! - `POST /whatsapp`         Twilio webhook; the body is a `CODE=PRICE` correction

use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Form, Json, Router,
};
use quoteline_agent::{InquiryContext, InquiryResponse, QuoteRuntime, ReplyResponse};
use quoteline_core::{
    ApplicationError, AuditContext, DeskState, InterfaceError, Product, RequestedItem,
};
use quoteline_messaging::{InboundReply, WhatsAppWebhookForm};
use serde::{Deserialize, Serialize};
use tera::{Context, Tera};
use tracing::warn;
use uuid::Uuid;

use crate::health::health;

const DEMO_UNKNOWN_CODE: &str = "UNKNOWN_PRODUCT";

#[derive(Clone)]
pub struct AppState {
    pub runtime: Arc<QuoteRuntime>,
    templates: Arc<Tera>,
}

impl AppState {
    pub fn new(runtime: Arc<QuoteRuntime>) -> Self {
        Self { runtime, templates: init_templates() }
    }
}

fn init_templates() -> Arc<Tera> {
    let mut tera = Tera::default();
    if let Err(error) =
        tera.add_raw_template("index.html", include_str!("../../../templates/index.html"))
    {
        warn!(event_name = "system.templates.invalid", error = %error, "index template rejected");
    }
    Arc::new(tera)
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/health", get(health))
        .route("/catalog", get(catalog))
        .route("/trigger_example", get(trigger_example))
        .route("/inquiries", post(submit_inquiry))
        .route("/inquiries/text", post(submit_text_inquiry))
        .route("/whatsapp", post(whatsapp_webhook))
        .with_state(state)
}

#[derive(Debug, Deserialize)]
pub struct InquiryItem {
    pub code: String,
    pub quantity: u32,
}

#[derive(Debug, Deserialize)]
pub struct InquiryRequest {
    pub items: Vec<InquiryItem>,
    pub subject: Option<String>,
    pub excerpt: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct TextInquiryRequest {
    pub text: String,
    pub subject: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
    pub message: &'static str,
    pub correlation_id: String,
}

pub struct ApiError(InterfaceError);

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            InterfaceError::BadRequest { .. } => StatusCode::BAD_REQUEST,
        };
        let body = ErrorBody {
            error: self.0.to_string(),
            message: self.0.user_message(),
            correlation_id: self.0.correlation_id().to_owned(),
        };
        (status, Json(body)).into_response()
    }
}

fn request_context(sender: Option<String>, actor: &str) -> AuditContext {
    AuditContext::new(sender, Uuid::new_v4().to_string(), actor)
}

fn interface_error(error: impl Into<ApplicationError>, audit: &AuditContext) -> ApiError {
    ApiError(error.into().into_interface(audit.correlation_id.clone()))
}

async fn index(State(state): State<AppState>) -> Result<Html<String>, (StatusCode, Html<String>)> {
    let snapshot = state.runtime.snapshot().await;

    let mut context = Context::new();
    context.insert("service", "Quoteline");
    context.insert("generator_mode", state.runtime.generator_mode().as_str());
    context.insert("channel", state.runtime.channel_name());
    context.insert(
        "state",
        match snapshot.state {
            DeskState::Empty => "No quote is waiting for prices.",
            DeskState::AwaitingPrices => "Waiting for prices.",
        },
    );
    context.insert("missing", &snapshot.missing);
    context.insert("products", &snapshot.products);

    let html = state.templates.render("index.html", &context).map_err(|error| {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Html(format!("<h1>Template Error</h1><pre>{error:?}</pre>")),
        )
    })?;
    Ok(Html(html))
}

async fn catalog(State(state): State<AppState>) -> Json<Vec<Product>> {
    Json(state.runtime.products().await)
}

/// A seeded product plus one code the catalog does not know.
async fn trigger_example(
    State(state): State<AppState>,
) -> Result<Json<InquiryResponse>, ApiError> {
    let audit = request_context(None, "demo");
    let mut requested = Vec::new();
    if let Some(product) = state.runtime.products().await.first() {
        requested.push((product.code.to_string(), 500));
    }
    requested.push((DEMO_UNKNOWN_CODE.to_owned(), 100));
    let items = requested
        .into_iter()
        .map(|(code, quantity)| RequestedItem::new(code, quantity))
        .collect::<Result<Vec<_>, _>>()
        .map_err(|error| interface_error(error, &audit))?;

    let context = InquiryContext {
        subject: Some("Demo price inquiry".to_owned()),
        ..InquiryContext::default()
    };
    let response = state
        .runtime
        .submit_items(items, context, &audit)
        .await
        .map_err(|error| interface_error(error, &audit))?;
    Ok(Json(response))
}

async fn submit_inquiry(
    State(state): State<AppState>,
    Json(request): Json<InquiryRequest>,
) -> Result<Json<InquiryResponse>, ApiError> {
    let audit = request_context(None, "http");
    let items = request
        .items
        .into_iter()
        .map(|item| RequestedItem::new(item.code, item.quantity))
        .collect::<Result<Vec<_>, _>>()
        .map_err(|error| interface_error(error, &audit))?;

    let context = InquiryContext {
        subject: request.subject,
        excerpt: request.excerpt,
        ..InquiryContext::default()
    };
    let response = state
        .runtime
        .submit_items(items, context, &audit)
        .await
        .map_err(|error| interface_error(error, &audit))?;
    Ok(Json(response))
}

async fn submit_text_inquiry(
    State(state): State<AppState>,
    Json(request): Json<TextInquiryRequest>,
) -> Result<Json<InquiryResponse>, ApiError> {
    let audit = request_context(None, "http");
    let response = state
        .runtime
        .submit_text(&request.text, request.subject, &audit)
        .await
        .map_err(|error| interface_error(error, &audit))?;
    Ok(Json(response))
}

/// Always 200; a rejected correction is answered over the reply channel.
async fn whatsapp_webhook(
    State(state): State<AppState>,
    Form(form): Form<WhatsAppWebhookForm>,
) -> Json<ReplyResponse> {
    let reply = InboundReply::from(form);
    let audit = request_context(reply.sender, "whatsapp");
    Json(state.runtime.handle_reply(&reply.body, &audit).await)
}
