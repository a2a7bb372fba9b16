use axum::{extract::State, http::StatusCode, Json};
use chrono::Utc;
use quoteline_agent::GeneratorMode;
use serde::Serialize;

use crate::routes::AppState;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthCheck {
    pub status: &'static str,
    pub detail: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: HealthCheck,
    pub generator: HealthCheck,
    pub channel: HealthCheck,
    pub checked_at: String,
}

/// Always 200: the deterministic generator and the log channel are degraded
/// modes, not outages.
pub async fn health(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let generator = match state.runtime.generator_mode() {
        GeneratorMode::Live => {
            HealthCheck { status: "ready", detail: "live assistant configured".to_string() }
        }
        GeneratorMode::Deterministic => HealthCheck {
            status: "degraded",
            detail: "no assistant configured; deterministic selection and composition".to_string(),
        },
    };
    let channel = match state.runtime.channel_name() {
        "log" => HealthCheck {
            status: "degraded",
            detail: "messaging not configured; notices are only logged".to_string(),
        },
        name => HealthCheck { status: "ready", detail: format!("delivering via {name}") },
    };
    let ready = generator.status == "ready" && channel.status == "ready";

    let payload = HealthResponse {
        status: if ready { "ready" } else { "degraded" },
        service: HealthCheck {
            status: "ready",
            detail: "quoteline-server runtime initialized".to_string(),
        },
        generator,
        channel,
        checked_at: Utc::now().to_rfc3339(),
    };
    (StatusCode::OK, Json(payload))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::{extract::State, http::StatusCode, Json};
    use quoteline_agent::llm::DeterministicTextGenerator;
    use quoteline_agent::testing::ScriptedGenerator;
    use quoteline_core::RecordingChannel;
    use quoteline_messaging::LoggingChannel;

    use crate::health::health;
    use crate::routes::tests::state_with;

    #[tokio::test]
    async fn deterministic_generator_and_log_channel_report_degraded() {
        let state = state_with(Arc::new(DeterministicTextGenerator), Arc::new(LoggingChannel));
        let (status, Json(payload)) = health(State(state)).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(payload.status, "degraded");
        assert_eq!(payload.generator.status, "degraded");
        assert_eq!(payload.channel.status, "degraded");
        assert_eq!(payload.service.status, "ready");
    }

    #[tokio::test]
    async fn live_generator_and_real_channel_report_ready() {
        let state = state_with(
            Arc::new(ScriptedGenerator::replying("ok")),
            Arc::new(RecordingChannel::default()),
        );
        let (_, Json(payload)) = health(State(state)).await;

        assert_eq!(payload.status, "ready");
        assert_eq!(payload.channel.detail, "delivering via recording");
    }
}
