use std::sync::Arc;

use quoteline_core::cpq::coerce_area_estimate;
use quoteline_core::{Product, ProductCode};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{info, warn};

use crate::llm::{GenerationError, GenerationRequest, ResponseFormat, TextGenerator};

const SELECTOR_SYSTEM_ROLE: &str = concat!(
    "You are a pricing assistant for a print and installation shop. ",
    "You answer with one strict JSON object and nothing else."
);

const SELECTOR_INSTRUCTION: &str = concat!(
    "Choose the single best matching product from the catalog for the customer inquiry ",
    "and estimate the quantity in the product's unit (area for per-m2 products). ",
    "Reply with a JSON object with exactly these fields: ",
    "\"product_code\" (a code from the catalog, or null if nothing fits), ",
    "\"area_estimate\" (a non-negative number), ",
    "\"rationale\" (one or two sentences), ",
    "\"pricing_notes\" (assumptions worth telling the customer)."
);

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AiSelection {
    pub product_code: Option<ProductCode>,
    pub area_estimate: Decimal,
    pub rationale: String,
    pub pricing_notes: String,
}

/// How a selection came to be. `Unparsed` keeps the raw assistant text.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SelectionOutcome {
    Parsed(AiSelection),
    Unparsed(String),
    Default(AiSelection),
}

impl SelectionOutcome {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Parsed(_) => "parsed",
            Self::Unparsed(_) => "unparsed",
            Self::Default(_) => "default",
        }
    }

    pub fn into_selection(self, default_area: Decimal) -> AiSelection {
        match self {
            Self::Parsed(selection) | Self::Default(selection) => selection,
            Self::Unparsed(raw) => AiSelection {
                product_code: None,
                area_estimate: default_area,
                rationale: format!("Assistant reply could not be parsed: {raw}"),
                pricing_notes: String::new(),
            },
        }
    }
}

pub struct ProductSelector {
    generator: Arc<dyn TextGenerator>,
    default_area: Decimal,
}

impl ProductSelector {
    pub fn new(generator: Arc<dyn TextGenerator>, default_area: Decimal) -> Self {
        Self { generator, default_area }
    }

    pub fn default_area(&self) -> Decimal {
        self.default_area
    }

    pub async fn select(&self, inquiry: &str, products: &[Product]) -> AiSelection {
        self.select_outcome(inquiry, products).await.into_selection(self.default_area)
    }

    pub async fn select_outcome(&self, inquiry: &str, products: &[Product]) -> SelectionOutcome {
        let request = GenerationRequest {
            system: SELECTOR_SYSTEM_ROLE.to_owned(),
            instruction: SELECTOR_INSTRUCTION.to_owned(),
            context: json!({
                "catalog": products,
                "inquiry": inquiry,
            }),
            format: ResponseFormat::JsonObject,
        };

        match self.generator.generate(&request).await {
            Ok(raw) => {
                let outcome = parse_selection(&raw);
                info!(
                    event_name = "selector.reply.parsed",
                    outcome = outcome.kind(),
                    "assistant selection received"
                );
                outcome
            }
            Err(GenerationError::NotConfigured) => {
                SelectionOutcome::Default(self.default_selection(products))
            }
            Err(error) => {
                warn!(
                    event_name = "selector.generation_failed",
                    error = %error,
                    "assistant unavailable; using default selection"
                );
                SelectionOutcome::Default(self.default_selection(products))
            }
        }
    }

    /// Primary catalog product at the default area estimate.
    pub fn default_selection(&self, products: &[Product]) -> AiSelection {
        match products.first() {
            Some(product) => AiSelection {
                product_code: Some(product.code.clone()),
                area_estimate: self.default_area,
                rationale: format!("No assistant available; defaulted to {}.", product.name),
                pricing_notes: "Area is a placeholder estimate and should be confirmed."
                    .to_owned(),
            },
            None => AiSelection {
                product_code: None,
                area_estimate: self.default_area,
                rationale: "No assistant available and the catalog is empty.".to_owned(),
                pricing_notes: String::new(),
            },
        }
    }
}

pub fn parse_selection(raw: &str) -> SelectionOutcome {
    let Ok(Value::Object(fields)) = serde_json::from_str::<Value>(strip_code_fence(raw)) else {
        return SelectionOutcome::Unparsed(raw.to_owned());
    };

    let product_code = fields
        .get("product_code")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|code| !code.is_empty())
        .map(ProductCode::from);
    let area_estimate = match fields.get("area_estimate") {
        Some(Value::Number(number)) => coerce_area_estimate(&number.to_string()),
        Some(Value::String(text)) => coerce_area_estimate(text),
        // Absent or non-numeric: same soft failure as an uncoercible string.
        _ => Decimal::ZERO,
    };
    let text_field = |name: &str| {
        fields.get(name).and_then(Value::as_str).map(str::to_owned).unwrap_or_default()
    };

    SelectionOutcome::Parsed(AiSelection {
        product_code,
        area_estimate,
        rationale: text_field("rationale"),
        pricing_notes: text_field("pricing_notes"),
    })
}

fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(inner) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let inner = inner.strip_prefix("json").unwrap_or(inner);
    inner.strip_suffix("```").unwrap_or(inner).trim()
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use quoteline_core::{Product, ProductCode};
    use rust_decimal::Decimal;

    use super::{parse_selection, ProductSelector, SelectionOutcome};
    use crate::llm::{DeterministicTextGenerator, GenerationError};
    use crate::testing::ScriptedGenerator;

    fn products() -> Vec<Product> {
        vec![
            Product {
                code: ProductCode::from("TILE"),
                name: "Ceramic tile".to_owned(),
                unit: "m2".to_owned(),
                unit_price: Decimal::new(2500, 2),
            },
            Product {
                code: ProductCode::from("VINYL"),
                name: "Vinyl floor".to_owned(),
                unit: "m2".to_owned(),
                unit_price: Decimal::new(1800, 2),
            },
        ]
    }

    #[tokio::test]
    async fn parses_strict_json_reply_and_sends_catalog_context() {
        let reply = r#"{"product_code":"VINYL","area_estimate":12.5,"rationale":"kitchen floor","pricing_notes":"excl. skirting"}"#;
        let generator = Arc::new(ScriptedGenerator::replying(reply));
        let selector = ProductSelector::new(generator.clone(), Decimal::new(4, 0));

        let outcome = selector.select_outcome("new floor for a 12 m2 kitchen", &products()).await;
        let SelectionOutcome::Parsed(selection) = outcome else {
            panic!("expected parsed selection");
        };
        assert_eq!(selection.product_code, Some(ProductCode::from("VINYL")));
        assert_eq!(selection.area_estimate, Decimal::new(125, 1));
        assert_eq!(selection.pricing_notes, "excl. skirting");

        let seen = generator.requests();
        assert_eq!(seen.len(), 1, "exactly one attempt per inquiry");
        assert_eq!(seen[0].context["catalog"][1]["code"], "VINYL");
        assert_eq!(seen[0].context["inquiry"], "new floor for a 12 m2 kitchen");
    }

    #[tokio::test]
    async fn unparsable_reply_degrades_to_visible_placeholder() {
        let generator = Arc::new(ScriptedGenerator::replying("I think tiles?"));
        let selector = ProductSelector::new(generator, Decimal::new(4, 0));

        let selection = selector.select("bathroom", &products()).await;
        assert_eq!(selection.product_code, None);
        assert_eq!(selection.area_estimate, Decimal::new(4, 0));
        assert!(selection.rationale.contains("I think tiles?"));
    }

    #[tokio::test]
    async fn unconfigured_generator_yields_primary_product_default() {
        let selector =
            ProductSelector::new(Arc::new(DeterministicTextGenerator), Decimal::new(4, 0));

        let outcome = selector.select_outcome("anything", &products()).await;
        assert!(matches!(outcome, SelectionOutcome::Default(_)));
        let selection = outcome.into_selection(Decimal::new(4, 0));
        assert_eq!(selection.product_code, Some(ProductCode::from("TILE")));
        assert_eq!(selection.area_estimate, Decimal::new(4, 0));
    }

    #[tokio::test]
    async fn failed_live_call_falls_back_to_default_selection() {
        let failure = GenerationError::Transport("timeout".to_owned());
        let generator = Arc::new(ScriptedGenerator::failing(failure));
        let selector = ProductSelector::new(generator, Decimal::new(4, 0));

        let outcome = selector.select_outcome("anything", &products()).await;
        assert!(matches!(outcome, SelectionOutcome::Default(_)));
    }

    #[test]
    fn parse_tolerates_fences_null_codes_and_bad_areas() {
        let fenced =
            parse_selection("```json\n{\"product_code\": null, \"area_estimate\": \"lots\"}\n```");
        let SelectionOutcome::Parsed(selection) = fenced else {
            panic!("fenced json should parse");
        };
        assert_eq!(selection.product_code, None);
        assert_eq!(selection.area_estimate, Decimal::ZERO);
        assert_eq!(selection.rationale, "");

        let comma = parse_selection(r#"{"product_code":"TILE","area_estimate":"7,5"}"#);
        assert!(matches!(
            comma,
            SelectionOutcome::Parsed(ref s) if s.area_estimate == Decimal::new(75, 1)
        ));

        assert!(matches!(parse_selection("[1, 2]"), SelectionOutcome::Unparsed(_)));
    }

    #[test]
    fn missing_area_estimate_prices_as_zero_not_default() {
        let outcome = parse_selection(r#"{"product_code":"TILE","rationale":"no size given"}"#);
        let SelectionOutcome::Parsed(selection) = outcome else {
            panic!("object without area should still parse");
        };
        assert_eq!(selection.product_code, Some(ProductCode::from("TILE")));
        assert_eq!(selection.area_estimate, Decimal::ZERO);
    }

    #[test]
    fn huge_area_estimate_parses_unchanged() {
        let outcome = parse_selection(r#"{"product_code":"TILE","area_estimate":1e28}"#);
        assert!(matches!(
            outcome,
            SelectionOutcome::Parsed(ref s)
                if s.area_estimate == Decimal::from_scientific("1e28").expect("literal")
        ));
    }
}
