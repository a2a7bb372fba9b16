use serde::{Deserialize, Serialize};

use crate::cpq::catalog::Catalog;
use crate::domain::quote::{AmountOverflow, MissingItem, PricedItem, RequestedItem};

/// Partition of a requested item list against the catalog at one instant.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resolution {
    pub priced: Vec<PricedItem>,
    pub missing: Vec<MissingItem>,
}

impl Resolution {
    pub fn is_complete(&self) -> bool {
        self.missing.is_empty()
    }
}

/// Both outputs keep input order. Pure: the same inputs always give the same partition.
pub fn resolve(
    requested: &[RequestedItem],
    catalog: &Catalog,
) -> Result<Resolution, AmountOverflow> {
    let mut resolution = Resolution::default();

    for item in requested {
        match catalog.unit_price(&item.code) {
            Some(unit_price) => resolution.priced.push(PricedItem::new(
                item.code.clone(),
                item.quantity,
                unit_price,
            )?),
            None => resolution.missing.push(MissingItem::from(item)),
        }
    }

    Ok(resolution)
}
