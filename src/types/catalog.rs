//! # Catalog Types
//!
//! Read-side product and variant records consumed from the catalog layer.

use std::borrow::Cow;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ============================================================================
// IDENTIFIERS
// ============================================================================

/// Unique product identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProductId(pub Cow<'static, str>);

impl ProductId {
    /// Creates a new product ID.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(Cow::Owned(id.into()))
    }

    /// Creates a product ID from a static string slice (zero-copy).
    #[must_use]
    pub fn from_static(id: &'static str) -> Self {
        Self(Cow::Borrowed(id))
    }

    /// Generates a new unique product ID.
    #[must_use]
    pub fn generate() -> Self {
        Self(Cow::Owned(uuid::Uuid::new_v4().to_string()))
    }

    /// Returns the ID as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ProductId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique variant identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VariantId(pub Cow<'static, str>);

impl VariantId {
    /// Creates a new variant ID.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(Cow::Owned(id.into()))
    }

    /// Creates a variant ID from a static string slice (zero-copy).
    #[must_use]
    pub fn from_static(id: &'static str) -> Self {
        Self(Cow::Borrowed(id))
    }

    /// Returns the ID as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for VariantId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Category identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CategoryId(pub Cow<'static, str>);

impl CategoryId {
    /// Creates a new category ID.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(Cow::Owned(id.into()))
    }

    /// Creates a category ID from a static string slice (zero-copy).
    #[must_use]
    pub fn from_static(id: &'static str) -> Self {
        Self(Cow::Borrowed(id))
    }
}

impl std::fmt::Display for CategoryId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Customer identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CustomerId(pub String);

impl CustomerId {
    /// Creates a new customer ID.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl std::fmt::Display for CustomerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Currency code (ISO 4217).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Currency(pub String);

impl Currency {
    /// Creates a new currency code.
    #[must_use]
    pub fn new(code: impl Into<String>) -> Self {
        Self(code.into())
    }

    /// US Dollar.
    #[must_use]
    pub fn usd() -> Self {
        Self("USD".to_string())
    }

    /// Euro.
    #[must_use]
    pub fn eur() -> Self {
        Self("EUR".to_string())
    }
}

impl Default for Currency {
    fn default() -> Self {
        Self::usd()
    }
}

impl std::fmt::Display for Currency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// PRODUCT
// ============================================================================

/// Product visibility in storefront listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Visibility {
    /// Listed and searchable.
    #[default]
    Public,
    /// Reachable by direct link only.
    Unlisted,
    /// Not exposed to customers.
    Hidden,
}

/// Product record.
///
/// `stock_quantity` is a read-cache derived from the inventory table and
/// refreshed on every inventory write; it is never the source of truth.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    /// Product ID.
    pub id:             ProductId,
    /// Product title.
    pub title:          String,
    /// Base price in minor currency units.
    pub price:          u64,
    /// Promotional price, when set.
    pub discount_price: Option<u64>,
    /// Currency code.
    pub currency:       Currency,
    /// Derived stock read-cache.
    pub stock_quantity: u32,
    /// Whether the product can be purchased.
    pub is_active:      bool,
    /// Storefront visibility.
    pub visibility:     Visibility,
    /// Category memberships, used by coupon scoping.
    pub categories:     Vec<CategoryId>,
    /// Creation timestamp.
    pub created_at:     DateTime<Utc>,
    /// Last update timestamp.
    pub updated_at:     DateTime<Utc>,
}

impl Product {
    /// Creates a new active product.
    #[must_use]
    pub fn new(id: ProductId, title: impl Into<String>, price: u64, currency: Currency) -> Self {
        let now = Utc::now();
        Self {
            id,
            title: title.into(),
            price,
            discount_price: None,
            currency,
            stock_quantity: 0,
            is_active: true,
            visibility: Visibility::Public,
            categories: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Sets a promotional price.
    #[must_use]
    pub fn with_discount_price(mut self, price: u64) -> Self {
        self.discount_price = Some(price);
        self
    }

    /// Adds a category membership.
    #[must_use]
    pub fn with_category(mut self, category_id: CategoryId) -> Self {
        self.categories.push(category_id);
        self
    }

    /// Base price before any deal, preferring the promotional price.
    #[must_use]
    pub fn base_price(&self) -> u64 {
        self.discount_price.unwrap_or(self.price)
    }

    /// Whether the product carries the given category.
    #[must_use]
    pub fn in_category(&self, category_id: &CategoryId) -> bool {
        self.categories.contains(category_id)
    }
}

/// Product variant.
///
/// A variant cannot outlive its owning product. Its `stock_quantity` is a
/// derived read-cache, same as the product's.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductVariant {
    /// Variant ID.
    pub id:             VariantId,
    /// Owning product ID.
    pub product_id:     ProductId,
    /// Variant-specific price, overriding the product price.
    pub price_override: Option<u64>,
    /// Derived stock read-cache.
    pub stock_quantity: u32,
    /// Whether the variant is active.
    pub is_active:      bool,
}

impl ProductVariant {
    /// Creates a new variant.
    #[must_use]
    pub fn new(id: VariantId, product_id: ProductId) -> Self {
        Self {
            id,
            product_id,
            price_override: None,
            stock_quantity: 0,
            is_active: true,
        }
    }

    /// Sets a price override.
    #[must_use]
    pub fn with_price(mut self, price: u64) -> Self {
        self.price_override = Some(price);
        self
    }
}
