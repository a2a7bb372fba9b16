use std::env;
use std::sync::{Mutex, OnceLock};

use quoteline_cli::commands::quote::{self, QuoteArgs};
use quoteline_cli::commands::{config, doctor};
use serde_json::Value;

#[test]
fn quote_runs_worked_example_and_prints_each_notice() {
    with_env(&[], || {
        let result = quote::run(QuoteArgs {
            items: vec!["CARDS_4_4_500=500".to_string(), "FLYER_A5=100".to_string()],
            prices: vec!["FLYER_A5=12,50".to_string()],
            ..QuoteArgs::default()
        });
        assert_eq!(result.exit_code, 0, "expected successful quote run");

        let lines: Vec<&str> = result.output.lines().collect();
        let notices: Vec<Value> = lines
            .iter()
            .take_while(|line| line.starts_with("{\"kind\""))
            .map(|line| parse_payload(line))
            .collect();
        let kinds: Vec<&str> =
            notices.iter().map(|notice| notice["kind"].as_str().unwrap_or_default()).collect();
        assert_eq!(kinds, vec!["price_request", "price_confirmation", "quote_ready"]);
        let quote_body = notices[2]["body"].as_str().unwrap_or_default();
        assert!(quote_body.contains("Total incl. VAT: 1548.00"), "{quote_body}");

        let payload = parse_payload(last_line(&result.output));
        assert_eq!(payload["command"], "quote");
        assert_eq!(payload["status"], "ok");
        assert_eq!(payload["details"]["steps"][0]["status"], "waiting_for_prices");
        assert_eq!(payload["details"]["steps"][1]["status"], "quote_ready");
        assert_eq!(payload["details"]["state"], "empty");
    });
}

#[test]
fn quote_reports_rejected_price_reply_without_failing() {
    with_env(&[], || {
        let result = quote::run(QuoteArgs {
            items: vec!["FLYER_A5=100".to_string()],
            prices: vec!["FLYER_A5=cheap".to_string()],
            ..QuoteArgs::default()
        });
        assert_eq!(result.exit_code, 0);

        let payload = parse_payload(last_line(&result.output));
        assert_eq!(payload["details"]["steps"][1]["status"], "rejected");
        assert_eq!(payload["details"]["state"], "awaiting_prices");
    });
}

#[test]
fn quote_rejects_malformed_item_argument() {
    with_env(&[], || {
        let result =
            quote::run(QuoteArgs { items: vec!["FLYER_A5".to_string()], ..QuoteArgs::default() });
        assert_eq!(result.exit_code, 2);

        let payload = parse_payload(&result.output);
        assert_eq!(payload["status"], "error");
        assert_eq!(payload["error_class"], "invalid_argument");
    });
}

#[test]
fn quote_returns_config_failure_for_invalid_env() {
    with_env(&[("QUOTELINE_LOGGING_LEVEL", "loud")], || {
        let result =
            quote::run(QuoteArgs { items: vec!["A=1".to_string()], ..QuoteArgs::default() });
        assert_eq!(result.exit_code, 2, "expected config validation failure code");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["error_class"], "config_validation");
    });
}

#[test]
fn doctor_warns_when_running_without_assistant_or_twilio() {
    with_env(&[], || {
        let result = doctor::run(true);
        assert_eq!(result.exit_code, 0);

        let report = parse_payload(&result.output);
        assert_eq!(report["overall_status"], "warn");
        assert_eq!(report["checks"][0]["status"], "pass");
        assert_eq!(report["checks"][1]["name"], "assistant_mode");
        assert_eq!(report["checks"][1]["status"], "warn");
        assert_eq!(report["checks"][2]["status"], "warn");
    });
}

#[test]
fn doctor_passes_with_full_credentials() {
    with_env(
        &[
            ("OPENAI_API_KEY", "sk-test"),
            ("TWILIO_ACCOUNT_SID", "AC0123456789"),
            ("TWILIO_AUTH_TOKEN", "token"),
            ("TWILIO_WHATSAPP_FROM", "whatsapp:+14155238886"),
            ("MANAGER_WHATSAPP_TO", "whatsapp:+421900000000"),
        ],
        || {
            let result = doctor::run(true);
            assert_eq!(result.exit_code, 0);

            let report = parse_payload(&result.output);
            assert_eq!(report["overall_status"], "pass");
        },
    );
}

#[test]
fn doctor_fails_and_skips_when_config_invalid() {
    with_env(&[("QUOTELINE_SERVER_PORT", "not-a-port")], || {
        let result = doctor::run(false);
        assert_eq!(result.exit_code, 1);
        assert!(result.output.starts_with("doctor: one or more readiness checks failed"));
        assert!(result.output.contains("- [skip] assistant_mode"));
    });
}

#[test]
fn config_redacts_secrets_and_attributes_env_aliases() {
    with_env(&[("OPENAI_API_KEY", "sk-secret-value"), ("PORT", "8080")], || {
        let output = config::run();

        assert!(output.contains("- llm.api_key = <redacted> (source: env (OPENAI_API_KEY))"));
        assert!(output.contains("- server.port = 8080 (source: env (PORT))"));
        assert!(output.contains("- pricing.labor_rate = 8.00 (source: default)"));
        assert!(!output.contains("sk-secret-value"));
    });
}

fn parse_payload(output: &str) -> Value {
    serde_json::from_str(output).expect("command output should be valid JSON")
}

fn last_line(output: &str) -> &str {
    output.lines().last().unwrap_or_default()
}

fn with_env(vars: &[(&str, &str)], test_fn: impl FnOnce()) {
    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    let _guard =
        ENV_LOCK.get_or_init(|| Mutex::new(())).lock().expect("env mutex should not be poisoned");

    let keys = [
        "QUOTELINE_LLM_PROVIDER",
        "QUOTELINE_LLM_API_KEY",
        "QUOTELINE_LLM_BASE_URL",
        "QUOTELINE_LLM_MODEL",
        "QUOTELINE_LLM_TIMEOUT_SECS",
        "QUOTELINE_LLM_TEMPERATURE",
        "QUOTELINE_MESSAGING_PROVIDER",
        "QUOTELINE_TWILIO_API_BASE",
        "QUOTELINE_TWILIO_ACCOUNT_SID",
        "QUOTELINE_TWILIO_AUTH_TOKEN",
        "QUOTELINE_WHATSAPP_FROM",
        "QUOTELINE_MANAGER_WHATSAPP_TO",
        "QUOTELINE_SERVER_BIND_ADDRESS",
        "QUOTELINE_SERVER_PORT",
        "QUOTELINE_PRICING_LABOR_RATE",
        "QUOTELINE_PRICING_DEFAULT_AREA_ESTIMATE",
        "QUOTELINE_LOGGING_LEVEL",
        "QUOTELINE_LOGGING_FORMAT",
        "QUOTELINE_LOG_LEVEL",
        "QUOTELINE_LOG_FORMAT",
        "OPENAI_API_KEY",
        "TWILIO_ACCOUNT_SID",
        "TWILIO_AUTH_TOKEN",
        "TWILIO_WHATSAPP_FROM",
        "MANAGER_WHATSAPP_TO",
        "PORT",
    ];

    let previous_values: Vec<(&str, Option<String>)> =
        keys.iter().map(|key| (*key, env::var(key).ok())).collect();

    for key in &keys {
        env::remove_var(key);
    }
    for (key, value) in vars {
        env::set_var(key, value);
    }

    test_fn();

    for (key, value) in previous_values {
        if let Some(value) = value {
            env::set_var(key, value);
        } else {
            env::remove_var(key);
        }
    }
}
