use rust_decimal::Decimal;

use crate::domain::product::{Product, ProductCode};

/// Product code to unit price mapping. Entries are never removed; a write for
/// an existing code replaces its price (last writer wins).
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Catalog {
    products: Vec<Product>,
}

impl Catalog {
    pub fn new(products: Vec<Product>) -> Self {
        let mut catalog = Self::default();
        for product in products {
            catalog.upsert(product);
        }
        catalog
    }

    pub fn find(&self, code: &ProductCode) -> Option<&Product> {
        self.products.iter().find(|product| &product.code == code)
    }

    pub fn unit_price(&self, code: &ProductCode) -> Option<Decimal> {
        self.find(code).map(|product| product.unit_price)
    }

    pub fn contains(&self, code: &ProductCode) -> bool {
        self.find(code).is_some()
    }

    /// First seeded product; used when no assistant is available to choose.
    pub fn primary(&self) -> Option<&Product> {
        self.products.first()
    }

    pub fn products(&self) -> &[Product] {
        &self.products
    }

    pub fn len(&self) -> usize {
        self.products.len()
    }

    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }

    /// Returns the previous price when the code was already known.
    pub fn set_price(&mut self, code: ProductCode, unit_price: Decimal) -> Option<Decimal> {
        match self.products.iter_mut().find(|product| product.code == code) {
            Some(product) => Some(std::mem::replace(&mut product.unit_price, unit_price)),
            None => {
                self.products.push(Product::priced(code, unit_price));
                None
            }
        }
    }

    fn upsert(&mut self, product: Product) {
        match self.products.iter_mut().find(|existing| existing.code == product.code) {
            Some(existing) => *existing = product,
            None => self.products.push(product),
        }
    }
}
