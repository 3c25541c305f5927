//! Catalog domain types.
//!
//! Brands, categories and tags share one shape (an id and a name) and are
//! stored through the same repository calls, keyed by [`LookupKind`].

use chrono::{DateTime, Utc};
use serde::Serialize;

use bazaar_core::{
    AttributeId, BrandId, CartId, CategoryId, Price, ProductId, TagId, UserId, schema::Model,
};

/// The three name-only catalog tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LookupKind {
    Brand,
    Category,
    Tag,
}

impl LookupKind {
    /// Backing table.
    #[must_use]
    pub const fn model(self) -> Model {
        match self {
            Self::Brand => Model::BRAND,
            Self::Category => Model::CATEGORY,
            Self::Tag => Model::TAG,
        }
    }

    /// Singular label used in messages.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Brand => "brand",
            Self::Category => "category",
            Self::Tag => "tag",
        }
    }
}

/// Untyped lookup row as stored.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct LookupRecord {
    pub id: i32,
    pub name: String,
}

/// A typed view over a [`LookupRecord`].
pub trait LookupEntity: From<LookupRecord> + Serialize + Send + 'static {
    /// Table this entity lives in.
    const KIND: LookupKind;
}

macro_rules! lookup_entity {
    ($name:ident, $id:ident, $kind:ident) => {
        #[derive(Debug, Clone, PartialEq, Eq, Serialize)]
        pub struct $name {
            pub id: $id,
            pub name: String,
        }

        impl From<LookupRecord> for $name {
            fn from(record: LookupRecord) -> Self {
                Self {
                    id: $id::new(record.id),
                    name: record.name,
                }
            }
        }

        impl LookupEntity for $name {
            const KIND: LookupKind = LookupKind::$kind;
        }
    };
}

lookup_entity!(Brand, BrandId, Brand);
lookup_entity!(Category, CategoryId, Category);
lookup_entity!(Tag, TagId, Tag);

/// Maximum length of catalog names.
pub const NAME_MAX_LENGTH: usize = 255;

/// A product with its relationships resolved to ids.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub description: String,
    pub price: Price,
    /// A referenced brand cannot be deleted.
    pub brand: Option<BrandId>,
    /// Sorted ascending.
    pub categories: Vec<CategoryId>,
    /// Sorted ascending.
    pub tags: Vec<TagId>,
}

impl Product {
    /// Apply `changes` in place.
    pub fn apply(&mut self, changes: ProductChanges) {
        if let Some(name) = changes.name {
            self.name = name;
        }
        if let Some(description) = changes.description {
            self.description = description;
        }
        if let Some(price) = changes.price {
            self.price = price;
        }
        if let Some(brand) = changes.brand {
            self.brand = brand;
        }
        if let Some(categories) = changes.categories {
            self.categories = categories;
        }
        if let Some(tags) = changes.tags {
            self.tags = tags;
        }
    }
}

/// A validated product about to be inserted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewProduct {
    pub name: String,
    pub description: String,
    pub price: Price,
    pub brand: Option<BrandId>,
    pub categories: Vec<CategoryId>,
    pub tags: Vec<TagId>,
}

/// A partial update; `None` leaves a field unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProductChanges {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<Price>,
    /// `Some(None)` clears the brand.
    pub brand: Option<Option<BrandId>>,
    pub categories: Option<Vec<CategoryId>>,
    pub tags: Option<Vec<TagId>>,
}

/// A name/value pair attached to one product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Attribute {
    pub id: AttributeId,
    /// Deleting the product deletes the attribute.
    pub product: ProductId,
    pub name: String,
    pub value: String,
}

/// A validated attribute about to be inserted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAttribute {
    pub product: ProductId,
    pub name: String,
    pub value: String,
}

/// A user's cart. Each user owns at most one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Cart {
    pub id: CartId,
    pub user: UserId,
    pub created_at: DateTime<Utc>,
}
