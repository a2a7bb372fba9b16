use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProductCode(pub String);

impl ProductCode {
    pub fn new(code: impl Into<String>) -> Self {
        Self(code.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProductCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ProductCode {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

/// A catalog entry. `unit` names what `unit_price` is charged per (`pcs`, `m2`, ...).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub code: ProductCode,
    pub name: String,
    pub unit: String,
    pub unit_price: Decimal,
}

impl Product {
    pub const DEFAULT_UNIT: &'static str = "pcs";

    /// Entry for a code that only ever arrived as a price correction.
    pub fn priced(code: ProductCode, unit_price: Decimal) -> Self {
        Self {
            name: code.0.clone(),
            code,
            unit: Self::DEFAULT_UNIT.to_owned(),
            unit_price,
        }
    }
}
