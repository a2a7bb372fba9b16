use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::product::{Product, ProductCode};
use crate::domain::quote::{AmountOverflow, PricedItem, QuoteTotals};

/// Fixed VAT rate (20%).
pub const VAT_RATE: Decimal = Decimal::from_parts(20, 0, 0, false, 2);

pub fn totalize(priced: &[PricedItem]) -> Result<QuoteTotals, AmountOverflow> {
    let subtotal = priced
        .iter()
        .try_fold(Decimal::ZERO, |sum, item| sum.checked_add(item.line_total))
        .ok_or(AmountOverflow)?;
    totals_from_subtotal(subtotal)
}

pub fn totals_from_subtotal(subtotal: Decimal) -> Result<QuoteTotals, AmountOverflow> {
    let tax = subtotal.checked_mul(VAT_RATE).ok_or(AmountOverflow)?;
    let total = subtotal.checked_add(tax).ok_or(AmountOverflow)?;
    Ok(QuoteTotals { subtotal, tax, total })
}

/// Material plus labor priced per unit of estimated area.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AreaQuote {
    pub code: ProductCode,
    pub product_name: String,
    pub unit: String,
    pub price_per_unit: Decimal,
    pub area: Decimal,
    pub labor_rate: Decimal,
    pub material: Decimal,
    pub labor: Decimal,
    pub totals: QuoteTotals,
}

pub fn price_area(
    product: &Product,
    area: Decimal,
    labor_rate: Decimal,
) -> Result<AreaQuote, AmountOverflow> {
    let area = area.max(Decimal::ZERO);
    let material = product.unit_price.checked_mul(area).ok_or(AmountOverflow)?;
    let labor = labor_rate.checked_mul(area).ok_or(AmountOverflow)?;
    let totals = totals_from_subtotal(material.checked_add(labor).ok_or(AmountOverflow)?)?;

    Ok(AreaQuote {
        code: product.code.clone(),
        product_name: product.name.clone(),
        unit: product.unit.clone(),
        price_per_unit: product.unit_price,
        area,
        labor_rate,
        material,
        labor,
        totals,
    })
}

/// Lenient area parsing: anything that is not a non-negative number becomes zero,
/// which prices as an empty quote instead of failing the request.
pub fn coerce_area_estimate(raw: &str) -> Decimal {
    let normalized = raw.trim().replace(',', ".");
    Decimal::from_str(&normalized)
        .or_else(|_| Decimal::from_scientific(&normalized))
        .ok()
        .filter(|area| !area.is_sign_negative())
        .unwrap_or(Decimal::ZERO)
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::{coerce_area_estimate, price_area, totalize, VAT_RATE};
    use crate::domain::product::{Product, ProductCode};
    use crate::domain::quote::{AmountOverflow, PricedItem};

    fn line(code: &str, quantity: u32, unit_price: Decimal) -> PricedItem {
        PricedItem::new(ProductCode::from(code), quantity, unit_price).expect("line in range")
    }

    fn tile() -> Product {
        Product {
            code: ProductCode::from("TILE"),
            name: "Ceramic tile".to_owned(),
            unit: "m2".to_owned(),
            unit_price: Decimal::new(2500, 2),
        }
    }

    #[test]
    fn vat_rate_is_twenty_percent() {
        assert_eq!(VAT_RATE, Decimal::new(20, 2));
    }

    #[test]
    fn totals_follow_the_worked_example() {
        let priced =
            vec![line("A", 500, Decimal::new(8, 2)), line("B", 100, Decimal::new(1250, 2))];
        let totals = totalize(&priced).expect("totals in range");

        assert_eq!(totals.subtotal, Decimal::new(1290, 0));
        assert_eq!(totals.tax, Decimal::new(258, 0));
        assert_eq!(totals.total, Decimal::new(1548, 0));
    }

    #[test]
    fn total_is_subtotal_times_one_point_two() {
        for cents in [0_i64, 1, 99, 12_345, 9_999_999] {
            let totals = totalize(&[line("A", 3, Decimal::new(cents, 2))]).expect("in range");
            assert_eq!(totals.total, totals.subtotal * Decimal::new(120, 2));
        }
    }

    #[test]
    fn empty_item_list_totals_zero() {
        let totals = totalize(&[]).expect("empty totals");
        assert_eq!(totals.total, Decimal::ZERO);
    }

    #[test]
    fn subtotal_or_tax_beyond_decimal_range_is_an_error() {
        let huge = Decimal::MAX / Decimal::TWO;
        let lines = [line("A", 1, huge), line("B", 1, huge), line("C", 1, huge)];
        assert_eq!(totalize(&lines), Err(AmountOverflow));

        assert_eq!(totalize(&[line("A", 1, Decimal::MAX)]), Err(AmountOverflow));
    }

    #[test]
    fn area_quote_adds_material_and_labor() {
        let quote =
            price_area(&tile(), Decimal::new(40, 1), Decimal::new(800, 2)).expect("in range");

        assert_eq!(quote.material, Decimal::new(100, 0));
        assert_eq!(quote.labor, Decimal::new(32, 0));
        assert_eq!(quote.totals.subtotal, Decimal::new(132, 0));
        assert_eq!(quote.totals.total, Decimal::new(1584, 1));
    }

    #[test]
    fn huge_area_estimate_is_an_error() {
        let area = coerce_area_estimate("1e28");
        assert_eq!(area, Decimal::from_scientific("1e28").expect("literal"));
        assert_eq!(price_area(&tile(), area, Decimal::new(800, 2)), Err(AmountOverflow));
    }

    #[test]
    fn area_coercion_treats_garbage_as_zero() {
        assert_eq!(coerce_area_estimate("12,5"), Decimal::new(125, 1));
        assert_eq!(coerce_area_estimate(" 4 "), Decimal::new(4, 0));
        assert_eq!(coerce_area_estimate("1e2"), Decimal::new(100, 0));
        assert_eq!(coerce_area_estimate("about ten"), Decimal::ZERO);
        assert_eq!(coerce_area_estimate("-3"), Decimal::ZERO);
        assert_eq!(coerce_area_estimate(""), Decimal::ZERO);
    }
}
