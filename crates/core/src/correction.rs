//! The `CODE=PRICE` reply grammar.

use std::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::product::ProductCode;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceCorrection {
    pub code: ProductCode,
    pub unit_price: Decimal,
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum CorrectionError {
    #[error("correction is missing the `=` separator")]
    MissingSeparator,
    #[error("correction has an empty product code")]
    EmptyCode,
    #[error("price `{raw}` is not a number")]
    InvalidPrice { raw: String },
    #[error("price `{raw}` is negative")]
    NegativePrice { raw: String },
    #[error("price for `{code}` pushes the quote beyond the representable amount")]
    PriceOutOfRange { code: String },
}

impl CorrectionError {
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::MissingSeparator => {
                "Could not understand the reply. Please use the format CODE=12.50"
            }
            Self::EmptyCode | Self::InvalidPrice { .. } | Self::NegativePrice { .. } => {
                "The price must be a non-negative number, for example CODE=12.50"
            }
            Self::PriceOutOfRange { .. } => {
                "That price is too large to calculate the quote. Please send a smaller price."
            }
        }
    }
}

impl PriceCorrection {
    /// Splits on the first `=`; the price accepts `,` or `.` as decimal separator.
    pub fn parse(input: &str) -> Result<Self, CorrectionError> {
        let (code, raw_price) =
            input.trim().split_once('=').ok_or(CorrectionError::MissingSeparator)?;

        let code = code.trim();
        if code.is_empty() {
            return Err(CorrectionError::EmptyCode);
        }

        let raw_price = raw_price.trim();
        let unit_price = Decimal::from_str(&raw_price.replace(',', "."))
            .map_err(|_| CorrectionError::InvalidPrice { raw: raw_price.to_owned() })?;
        if unit_price.is_sign_negative() && !unit_price.is_zero() {
            return Err(CorrectionError::NegativePrice { raw: raw_price.to_owned() });
        }

        Ok(Self { code: ProductCode::from(code), unit_price })
    }
}

impl FromStr for PriceCorrection {
    type Err = CorrectionError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::parse(value)
    }
}

impl fmt::Display for PriceCorrection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.code, self.unit_price)
    }
}
