use serde::{Deserialize, Serialize};
use ts_rs::TS;
use utoipa::ToSchema;

use crate::{
    locale::pick_translation,
    models::{Product, ProductSupplier},
};

const QUOTE_CURRENCY: &str = "USD";

/// A wholesale offer from a supplier. Quotes are sample data until a sourcing
/// integration exists.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct SupplierQuote {
    pub id: i32,
    pub name: String,
    pub price: f64,
    pub currency: String,
    pub rating: f64,
    pub delivery_time: String,
}

/// A retail listing on a marketplace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct MarketplaceQuote {
    pub id: i32,
    pub name: String,
    pub price: f64,
    pub currency: String,
    pub url: String,
    pub rating: f64,
}

/// ProductComparison
///
/// Price research view of one product: where it can be bought, where it sells, and the
/// spread between the cheapest of each.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct ProductComparison {
    pub product_id: i32,
    pub locale: String,
    pub title: String,
    pub linked_suppliers: Vec<ProductSupplier>,
    pub suppliers: Vec<SupplierQuote>,
    pub marketplaces: Vec<MarketplaceQuote>,
    pub cheapest_supplier: Option<SupplierQuote>,
    pub cheapest_marketplace: Option<MarketplaceQuote>,
    /// Cheapest marketplace price minus cheapest supplier price.
    pub estimated_margin: Option<f64>,
}

pub fn supplier_quotes() -> Vec<SupplierQuote> {
    [
        (1, "TechSupply Co", 299.0, 4.8, "2-3 days"),
        (2, "Global Vendors", 285.0, 4.5, "3-5 days"),
        (3, "Quick Parts", 310.0, 4.9, "1-2 days"),
        (4, "Bulk Suppliers", 275.0, 4.3, "5-7 days"),
        (5, "Premium Parts", 320.0, 4.7, "2-4 days"),
    ]
    .into_iter()
    .map(|(id, name, price, rating, delivery)| SupplierQuote {
        id,
        name: name.to_string(),
        price,
        currency: QUOTE_CURRENCY.to_string(),
        rating,
        delivery_time: delivery.to_string(),
    })
    .collect()
}

pub fn marketplace_quotes() -> Vec<MarketplaceQuote> {
    [
        (1, "Amazon", 325.0, "https://amazon.com", 4.6),
        (2, "eBay", 295.0, "https://ebay.com", 4.4),
        (3, "Shopify Store", 315.0, "https://example-store.com", 4.7),
        (4, "Etsy", 340.0, "https://etsy.com", 4.8),
    ]
    .into_iter()
    .map(|(id, name, price, url, rating)| MarketplaceQuote {
        id,
        name: name.to_string(),
        price,
        currency: QUOTE_CURRENCY.to_string(),
        url: url.to_string(),
        rating,
    })
    .collect()
}

/// build_comparison
///
/// Assembles the comparison for `product`, titled in `locale` (falling back to the first
/// translation, then the default title).
pub fn build_comparison(product: &Product, locale: &str) -> ProductComparison {
    let suppliers = supplier_quotes();
    let marketplaces = marketplace_quotes();

    let cheapest_supplier = suppliers
        .iter()
        .min_by(|a, b| a.price.total_cmp(&b.price))
        .cloned();
    let cheapest_marketplace = marketplaces
        .iter()
        .min_by(|a, b| a.price.total_cmp(&b.price))
        .cloned();
    let estimated_margin = match (&cheapest_supplier, &cheapest_marketplace) {
        (Some(s), Some(m)) => Some(m.price - s.price),
        _ => None,
    };

    let title = pick_translation(&product.translations, locale)
        .map(|t| t.title.clone())
        .or_else(|| product.default_title.clone())
        .unwrap_or_default();

    ProductComparison {
        product_id: product.id,
        locale: locale.to_string(),
        title,
        linked_suppliers: product.suppliers.clone(),
        suppliers,
        marketplaces,
        cheapest_supplier,
        cheapest_marketplace,
        estimated_margin,
    }
}
