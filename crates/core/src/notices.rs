//! Plain-text payloads handed to the reply channel.

use rust_decimal::Decimal;

use crate::correction::CorrectionError;
use crate::domain::product::ProductCode;
use crate::domain::quote::MissingItem;

fn missing_lines(missing: &[MissingItem]) -> String {
    missing
        .iter()
        .map(|item| format!("{} (quantity {} pcs)", item.code, item.quantity))
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn price_request(missing: &[MissingItem]) -> String {
    let example = missing.first().map(|item| item.code.as_str()).unwrap_or("CODE");
    format!(
        "Prices are missing for these products:\n{}\n\nReply with one price per message in the format:\nCODE=unit_price\nExample: {example}=12.50",
        missing_lines(missing)
    )
}

pub fn price_reminder(missing: &[MissingItem]) -> String {
    format!(
        "Prices are still missing for:\n{}\n\nReply in the format CODE=10.50",
        missing_lines(missing)
    )
}

pub fn price_confirmation(code: &ProductCode, unit_price: Decimal) -> String {
    format!("Price for {code} set to {unit_price:.2} per unit.")
}

pub fn correction_rejected(error: &CorrectionError) -> String {
    error.user_message().to_owned()
}

pub fn quote_ready(quote_text: &str) -> String {
    format!("Quote draft ready:\n\n{quote_text}")
}

pub fn apology(reason: &str) -> String {
    format!(
        "Sorry, we could not prepare a quote for this inquiry ({reason}). A colleague will follow up shortly."
    )
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::{price_confirmation, price_reminder, price_request};
    use crate::domain::product::ProductCode;
    use crate::domain::quote::MissingItem;

    fn missing() -> Vec<MissingItem> {
        vec![
            MissingItem { code: ProductCode::from("B"), quantity: 100 },
            MissingItem { code: ProductCode::from("C"), quantity: 2 },
        ]
    }

    #[test]
    fn price_request_lists_each_code_with_quantity_and_grammar() {
        let text = price_request(&missing());

        assert!(text.contains("B (quantity 100 pcs)\nC (quantity 2 pcs)"));
        assert!(text.contains("CODE=unit_price"));
        assert!(text.contains("Example: B=12.50"));
    }

    #[test]
    fn reminder_repeats_residual_set() {
        let text = price_reminder(&missing()[1..]);
        assert!(text.contains("C (quantity 2 pcs)"));
        assert!(!text.contains("B (quantity"));
        assert!(text.contains("CODE=10.50"));
    }

    #[test]
    fn confirmation_shows_two_decimals() {
        assert_eq!(
            price_confirmation(&ProductCode::from("B"), Decimal::new(125, 1)),
            "Price for B set to 12.50 per unit."
        );
    }
}
