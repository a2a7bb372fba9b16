use std::sync::Arc;

use quoteline_agent::{generator_from_config, InquiryContext, QuoteRuntime};
use quoteline_core::audit::InMemoryAuditSink;
use quoteline_core::config::{AppConfig, LoadOptions};
use quoteline_core::{AuditContext, RecordingChannel, RequestedItem};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::commands::CommandResult;

#[derive(Clone, Debug, Default)]
pub struct QuoteArgs {
    pub items: Vec<String>,
    pub prices: Vec<String>,
    pub text: Option<String>,
    pub subject: Option<String>,
}

/// Runs the engine in-process. Each notice the reply channel would carry is
/// printed as one JSON line, followed by the command outcome.
pub fn run(args: QuoteArgs) -> CommandResult {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure("quote", "config_validation", error.to_string(), 2);
        }
    };

    let items = match parse_items(&args.items) {
        Ok(items) => items,
        Err(message) => return CommandResult::failure("quote", "invalid_argument", message, 2),
    };
    if args.text.is_none() && items.is_empty() {
        return CommandResult::failure(
            "quote",
            "invalid_argument",
            "pass at least one --item CODE=QTY or --text",
            2,
        );
    }

    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(error) => {
            return CommandResult::failure(
                "quote",
                "runtime",
                format!("failed to initialize async runtime: {error}"),
                1,
            );
        }
    };

    let channel = RecordingChannel::default();
    let audit_sink = InMemoryAuditSink::default();
    let engine = QuoteRuntime::new(
        config.catalog.build(),
        generator_from_config(&config.llm),
        Arc::new(channel.clone()),
        Arc::new(audit_sink.clone()),
        &config.pricing,
    );
    let audit = AuditContext::new(None, Uuid::new_v4().to_string(), "cli");

    let outcome = runtime.block_on(async {
        let mut steps: Vec<Value> = Vec::new();
        let submitted = match &args.text {
            Some(text) => engine.submit_text(text, args.subject.clone(), &audit).await,
            None => {
                let context =
                    InquiryContext { subject: args.subject.clone(), ..InquiryContext::default() };
                engine.submit_items(items, context, &audit).await
            }
        };
        let submitted = submitted.map_err(|error| error.to_string())?;
        steps.push(serde_json::to_value(submitted).map_err(|error| error.to_string())?);

        for price in &args.prices {
            let reply = engine.handle_reply(price, &audit).await;
            steps.push(serde_json::to_value(reply).map_err(|error| error.to_string())?);
        }
        Ok::<_, String>((steps, engine.snapshot().await))
    });

    let (steps, snapshot) = match outcome {
        Ok(outcome) => outcome,
        Err(message) => return CommandResult::failure("quote", "invalid_inquiry", message, 2),
    };

    let mut lines: Vec<String> = channel
        .messages()
        .iter()
        .filter_map(|message| serde_json::to_string(message).ok())
        .collect();
    let final_status = steps
        .last()
        .and_then(|step| step["status"].as_str())
        .unwrap_or("unknown")
        .to_string();
    let result = CommandResult::success(
        "quote",
        format!("final status: {final_status}"),
        json!({
            "correlation_id": audit.correlation_id,
            "steps": steps,
            "state": snapshot.state,
            "audit_events": audit_sink.events().len(),
        }),
    );
    lines.push(result.output);

    CommandResult { exit_code: 0, output: lines.join("\n") }
}

fn parse_items(raw: &[String]) -> Result<Vec<RequestedItem>, String> {
    raw.iter()
        .map(|entry| {
            let (code, quantity) = entry
                .split_once('=')
                .ok_or_else(|| format!("item `{entry}` must look like CODE=QTY"))?;
            let quantity = quantity
                .trim()
                .parse::<u32>()
                .map_err(|_| format!("item `{entry}` has an invalid quantity"))?;
            RequestedItem::new(code, quantity).map_err(|error| error.to_string())
        })
        .collect()
}
