use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::product::ProductCode;
use crate::errors::DomainError;

/// One `(code, quantity)` line of an inquiry.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestedItem {
    pub code: ProductCode,
    pub quantity: u32,
}

impl RequestedItem {
    pub fn new(code: impl Into<String>, quantity: u32) -> Result<Self, DomainError> {
        let code = code.into().trim().to_owned();
        if code.is_empty() {
            return Err(DomainError::InvalidInquiry("item code must not be empty".to_owned()));
        }
        if quantity == 0 {
            return Err(DomainError::InvalidInquiry(format!(
                "quantity for `{code}` must be greater than zero"
            )));
        }
        Ok(Self { code: ProductCode(code), quantity })
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricedItem {
    pub code: ProductCode,
    pub quantity: u32,
    pub unit_price: Decimal,
    pub line_total: Decimal,
}

/// A line total or quote total left the range `Decimal` can hold.
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
#[error("amount is outside the representable range")]
pub struct AmountOverflow;

impl PricedItem {
    pub fn new(
        code: ProductCode,
        quantity: u32,
        unit_price: Decimal,
    ) -> Result<Self, AmountOverflow> {
        let line_total = unit_price.checked_mul(Decimal::from(quantity)).ok_or(AmountOverflow)?;
        Ok(Self { code, quantity, unit_price, line_total })
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MissingItem {
    pub code: ProductCode,
    pub quantity: u32,
}

impl From<&RequestedItem> for MissingItem {
    fn from(item: &RequestedItem) -> Self {
        Self { code: item.code.clone(), quantity: item.quantity }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuoteTotals {
    pub subtotal: Decimal,
    pub tax: Decimal,
    pub total: Decimal,
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::{AmountOverflow, PricedItem, RequestedItem};
    use crate::domain::product::ProductCode;
    use crate::errors::DomainError;

    #[test]
    fn priced_item_line_total_is_unit_price_times_quantity() {
        let item =
            PricedItem::new(ProductCode::from("A"), 500, Decimal::new(8, 2)).expect("in range");
        assert_eq!(item.line_total, Decimal::new(40, 0));
    }

    #[test]
    fn line_total_beyond_decimal_range_is_an_error() {
        assert_eq!(PricedItem::new(ProductCode::from("B"), 2, Decimal::MAX), Err(AmountOverflow));
        assert!(PricedItem::new(ProductCode::from("B"), 1, Decimal::MAX).is_ok());
    }

    #[test]
    fn requested_item_trims_code_and_rejects_zero_quantity() {
        let item = RequestedItem::new("  CARDS ", 3).expect("valid item");
        assert_eq!(item.code.as_str(), "CARDS");

        let error = RequestedItem::new("CARDS", 0).expect_err("zero quantity");
        assert!(matches!(
            error,
            DomainError::InvalidInquiry(ref message) if message.contains("CARDS")
        ));

        assert!(RequestedItem::new("   ", 1).is_err());
    }
}
