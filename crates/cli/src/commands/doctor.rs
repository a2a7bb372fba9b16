use quoteline_agent::{generator_from_config, GeneratorMode};
use quoteline_core::config::{AppConfig, LoadOptions};
use quoteline_messaging::channel_from_config;
use serde::Serialize;

use crate::commands::CommandResult;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
enum CheckStatus {
    Pass,
    Warn,
    Fail,
    Skipped,
}

#[derive(Debug, Serialize)]
struct DoctorCheck {
    name: &'static str,
    status: CheckStatus,
    details: String,
}

#[derive(Debug, Serialize)]
struct DoctorReport {
    overall_status: CheckStatus,
    summary: String,
    checks: Vec<DoctorCheck>,
}

/// Exit code 1 when any check fails. Degraded modes only warn.
pub fn run(json_output: bool) -> CommandResult {
    let report = build_report();
    let exit_code = if report.overall_status == CheckStatus::Fail { 1 } else { 0 };

    let output = if json_output {
        serde_json::to_string_pretty(&report).unwrap_or_else(|error| {
            format!(
                "{{\"overall_status\":\"fail\",\"summary\":\"doctor serialization failed\",\"error\":\"{}\"}}",
                escape_json(&error.to_string())
            )
        })
    } else {
        render_human(&report)
    };

    CommandResult { exit_code, output }
}

fn build_report() -> DoctorReport {
    let mut checks = Vec::new();

    match AppConfig::load(LoadOptions::default()) {
        Ok(config) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Pass,
                details: "configuration loaded and validated".to_string(),
            });
            checks.push(check_generator(&config));
            checks.push(check_reply_channel(&config));
            checks.push(check_catalog(&config));
        }
        Err(error) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Fail,
                details: error.to_string(),
            });
            for name in ["assistant_mode", "reply_channel", "catalog_seed"] {
                checks.push(DoctorCheck {
                    name,
                    status: CheckStatus::Skipped,
                    details: "skipped because configuration did not load".to_string(),
                });
            }
        }
    }

    let failed = checks.iter().any(|check| check.status == CheckStatus::Fail);
    let warned = checks.iter().any(|check| check.status != CheckStatus::Pass);
    let (overall_status, summary) = match (failed, warned) {
        (true, _) => (CheckStatus::Fail, "doctor: one or more readiness checks failed"),
        (false, true) => (CheckStatus::Warn, "doctor: ready, running in a degraded mode"),
        (false, false) => (CheckStatus::Pass, "doctor: all readiness checks passed"),
    };

    DoctorReport { overall_status, summary: summary.to_string(), checks }
}

fn check_generator(config: &AppConfig) -> DoctorCheck {
    match generator_from_config(&config.llm).mode() {
        GeneratorMode::Live => DoctorCheck {
            name: "assistant_mode",
            status: CheckStatus::Pass,
            details: format!("live {:?} model `{}`", config.llm.provider, config.llm.model),
        },
        GeneratorMode::Deterministic => DoctorCheck {
            name: "assistant_mode",
            status: CheckStatus::Warn,
            details: "no api key configured; selection and composition use deterministic fallbacks"
                .to_string(),
        },
    }
}

fn check_reply_channel(config: &AppConfig) -> DoctorCheck {
    match channel_from_config(&config.messaging) {
        Ok(channel) if channel.name() == "log" => DoctorCheck {
            name: "reply_channel",
            status: CheckStatus::Warn,
            details: "twilio not configured; notices are only logged".to_string(),
        },
        Ok(channel) => DoctorCheck {
            name: "reply_channel",
            status: CheckStatus::Pass,
            details: format!("delivering via {}", channel.name()),
        },
        Err(error) => DoctorCheck {
            name: "reply_channel",
            status: CheckStatus::Fail,
            details: error.to_string(),
        },
    }
}

fn check_catalog(config: &AppConfig) -> DoctorCheck {
    let catalog = config.catalog.build();
    match catalog.primary() {
        Some(primary) => DoctorCheck {
            name: "catalog_seed",
            status: CheckStatus::Pass,
            details: format!("{} product(s), primary `{}`", catalog.len(), primary.code),
        },
        None => DoctorCheck {
            name: "catalog_seed",
            status: CheckStatus::Warn,
            details: "catalog is empty; every inquiry will wait for prices".to_string(),
        },
    }
}

fn render_human(report: &DoctorReport) -> String {
    let mut lines = Vec::new();
    lines.push(report.summary.clone());

    for check in &report.checks {
        let marker = match check.status {
            CheckStatus::Pass => "ok",
            CheckStatus::Warn => "warn",
            CheckStatus::Fail => "fail",
            CheckStatus::Skipped => "skip",
        };
        lines.push(format!("- [{marker}] {}: {}", check.name, check.details));
    }

    lines.join("\n")
}

fn escape_json(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}
