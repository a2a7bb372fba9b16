pub mod catalog;
pub mod pricing;
pub mod resolver;

pub use catalog::Catalog;
pub use pricing::{coerce_area_estimate, price_area, totalize, AreaQuote, VAT_RATE};
pub use resolver::{resolve, Resolution};
