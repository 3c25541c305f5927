//! Catalog repository: lookup tables, products, attributes and carts.

use std::collections::{BTreeSet, HashMap};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool};

use bazaar_core::{AttributeId, BrandId, CartId, CategoryId, Price, ProductId, TagId, UserId};

use super::{CatalogStore, RepositoryError};
use crate::models::{
    Attribute, Cart, LookupKind, LookupRecord, NewAttribute, NewProduct, Product, ProductChanges,
};

/// Database row for `catalog.product`, without its many-to-many sets.
#[derive(Debug, sqlx::FromRow)]
struct ProductRow {
    id: ProductId,
    name: String,
    description: String,
    price: Decimal,
    brand_id: Option<BrandId>,
}

impl ProductRow {
    fn into_product(
        self,
        categories: Vec<CategoryId>,
        tags: Vec<TagId>,
    ) -> Result<Product, RepositoryError> {
        let price = Price::new(self.price).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid price in database: {e}"))
        })?;

        Ok(Product {
            id: self.id,
            name: self.name,
            description: self.description,
            price,
            brand: self.brand_id,
            categories,
            tags,
        })
    }
}

/// One row of a product's join table.
#[derive(Debug, sqlx::FromRow)]
struct LinkRow {
    product_id: ProductId,
    target_id: i32,
}

#[derive(Debug, sqlx::FromRow)]
struct AttributeRow {
    id: AttributeId,
    product_id: ProductId,
    name: String,
    value: String,
}

impl From<AttributeRow> for Attribute {
    fn from(row: AttributeRow) -> Self {
        Self {
            id: row.id,
            product: row.product_id,
            name: row.name,
            value: row.value,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct CartRow {
    id: CartId,
    user_id: UserId,
    created_at: DateTime<Utc>,
}

impl From<CartRow> for Cart {
    fn from(row: CartRow) -> Self {
        Self {
            id: row.id,
            user: row.user_id,
            created_at: row.created_at,
        }
    }
}

const PRODUCT_COLUMNS: &str = "id, name, description, price, brand_id";

/// Join table and target column for a product's many-to-many field.
#[derive(Debug, Clone, Copy)]
enum ProductLink {
    Categories,
    Tags,
}

impl ProductLink {
    const fn table(self) -> &'static str {
        match self {
            Self::Categories => "catalog.product_categories",
            Self::Tags => "catalog.product_tags",
        }
    }

    const fn column(self) -> &'static str {
        match self {
            Self::Categories => "category_id",
            Self::Tags => "tag_id",
        }
    }

    /// Links grouped by product, each set sorted ascending.
    async fn load(
        self,
        conn: &mut PgConnection,
        products: &[ProductId],
    ) -> Result<HashMap<ProductId, Vec<i32>>, RepositoryError> {
        let rows: Vec<LinkRow> = sqlx::query_as(&format!(
            "SELECT product_id, {column} AS target_id FROM {table} \
             WHERE product_id = ANY($1) ORDER BY product_id, {column}",
            column = self.column(),
            table = self.table(),
        ))
        .bind(products)
        .fetch_all(&mut *conn)
        .await?;

        let mut grouped: HashMap<ProductId, Vec<i32>> = HashMap::new();
        for row in rows {
            grouped.entry(row.product_id).or_default().push(row.target_id);
        }
        Ok(grouped)
    }

    /// Replace the links of one product.
    async fn replace(
        self,
        conn: &mut PgConnection,
        product: ProductId,
        targets: &[i32],
    ) -> Result<(), RepositoryError> {
        sqlx::query(&format!("DELETE FROM {} WHERE product_id = $1", self.table()))
            .bind(product)
            .execute(&mut *conn)
            .await?;

        let unique: Vec<i32> = targets
            .iter()
            .copied()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        if unique.is_empty() {
            return Ok(());
        }

        sqlx::query(&format!(
            "INSERT INTO {} (product_id, {}) SELECT $1, UNNEST($2::int4[])",
            self.table(),
            self.column(),
        ))
        .bind(product)
        .bind(&unique)
        .execute(&mut *conn)
        .await
        .map_err(|e| RepositoryError::from_write(e, "duplicate product link"))?;

        Ok(())
    }
}

/// Resolve the many-to-many sets of `rows`.
async fn hydrate(
    conn: &mut PgConnection,
    rows: Vec<ProductRow>,
) -> Result<Vec<Product>, RepositoryError> {
    let ids: Vec<ProductId> = rows.iter().map(|r| r.id).collect();
    let mut categories = ProductLink::Categories.load(conn, &ids).await?;
    let mut tags = ProductLink::Tags.load(conn, &ids).await?;

    rows.into_iter()
        .map(|row| {
            let row_categories = categories
                .remove(&row.id)
                .unwrap_or_default()
                .into_iter()
                .map(CategoryId::new)
                .collect();
            let row_tags = tags
                .remove(&row.id)
                .unwrap_or_default()
                .into_iter()
                .map(TagId::new)
                .collect();
            row.into_product(row_categories, row_tags)
        })
        .collect()
}

async fn load_product(
    conn: &mut PgConnection,
    id: ProductId,
) -> Result<Option<Product>, RepositoryError> {
    let row: Option<ProductRow> = sqlx::query_as(&format!(
        "SELECT {PRODUCT_COLUMNS} FROM catalog.product WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?;

    let Some(row) = row else {
        return Ok(None);
    };
    Ok(hydrate(conn, vec![row]).await?.pop())
}

fn ids<T: Copy + Into<i32>>(values: &[T]) -> Vec<i32> {
    values.iter().map(|&v| v.into()).collect()
}

/// Repository for the catalog tables.
#[derive(Clone)]
pub struct CatalogRepository {
    pool: PgPool,
}

impl CatalogRepository {
    /// Create a new catalog repository.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CatalogStore for CatalogRepository {
    async fn list_lookups(&self, kind: LookupKind) -> Result<Vec<LookupRecord>, RepositoryError> {
        let rows = sqlx::query_as(&format!("SELECT id, name FROM {} ORDER BY id", kind.model()))
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    async fn get_lookup(
        &self,
        kind: LookupKind,
        id: i32,
    ) -> Result<Option<LookupRecord>, RepositoryError> {
        let row = sqlx::query_as(&format!("SELECT id, name FROM {} WHERE id = $1", kind.model()))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn missing_lookups(
        &self,
        kind: LookupKind,
        ids: &[i32],
    ) -> Result<Vec<i32>, RepositoryError> {
        let found: Vec<(i32,)> =
            sqlx::query_as(&format!("SELECT id FROM {} WHERE id = ANY($1)", kind.model()))
                .bind(ids)
                .fetch_all(&self.pool)
                .await?;

        let found: BTreeSet<i32> = found.into_iter().map(|(id,)| id).collect();
        Ok(ids.iter().copied().filter(|id| !found.contains(id)).collect())
    }

    async fn create_lookup(
        &self,
        kind: LookupKind,
        name: &str,
    ) -> Result<LookupRecord, RepositoryError> {
        let row = sqlx::query_as(&format!(
            "INSERT INTO {} (name) VALUES ($1) RETURNING id, name",
            kind.model()
        ))
        .bind(name)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| RepositoryError::from_write(e, &format!("{} already exists", kind.label())))?;
        Ok(row)
    }

    async fn rename_lookup(
        &self,
        kind: LookupKind,
        id: i32,
        name: &str,
    ) -> Result<Option<LookupRecord>, RepositoryError> {
        let row = sqlx::query_as(&format!(
            "UPDATE {} SET name = $2 WHERE id = $1 RETURNING id, name",
            kind.model()
        ))
        .bind(id)
        .bind(name)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| RepositoryError::from_write(e, &format!("{} already exists", kind.label())))?;
        Ok(row)
    }

    async fn delete_lookup(&self, kind: LookupKind, id: i32) -> Result<bool, RepositoryError> {
        let result = sqlx::query(&format!("DELETE FROM {} WHERE id = $1", kind.model()))
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                RepositoryError::from_delete(
                    e,
                    &format!("{} is referenced by products", kind.label()),
                )
            })?;

        Ok(result.rows_affected() > 0)
    }

    async fn list_products(&self) -> Result<Vec<Product>, RepositoryError> {
        let mut conn = self.pool.acquire().await?;
        let rows: Vec<ProductRow> = sqlx::query_as(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM catalog.product ORDER BY id"
        ))
        .fetch_all(&mut *conn)
        .await?;

        hydrate(&mut conn, rows).await
    }

    async fn get_product(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        let mut conn = self.pool.acquire().await?;
        load_product(&mut conn, id).await
    }

    async fn create_product(&self, product: NewProduct) -> Result<Product, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let (id,): (ProductId,) = sqlx::query_as(
            r"
            INSERT INTO catalog.product (name, description, price, brand_id)
            VALUES ($1, $2, $3, $4)
            RETURNING id
            ",
        )
        .bind(&product.name)
        .bind(&product.description)
        .bind(product.price.amount())
        .bind(product.brand)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| RepositoryError::from_write(e, "product already exists"))?;

        ProductLink::Categories
            .replace(&mut tx, id, &ids(&product.categories))
            .await?;
        ProductLink::Tags.replace(&mut tx, id, &ids(&product.tags)).await?;

        let created = load_product(&mut tx, id)
            .await?
            .ok_or(RepositoryError::NotFound)?;
        tx.commit().await?;

        Ok(created)
    }

    async fn update_product(
        &self,
        id: ProductId,
        changes: ProductChanges,
    ) -> Result<Option<Product>, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let clear_brand = matches!(changes.brand, Some(None));
        let brand = changes.brand.flatten();

        let updated: Option<(ProductId,)> = sqlx::query_as(
            r"
            UPDATE catalog.product SET
                name = COALESCE($2, name),
                description = COALESCE($3, description),
                price = COALESCE($4, price),
                brand_id = CASE WHEN $6 THEN NULL ELSE COALESCE($5, brand_id) END
            WHERE id = $1
            RETURNING id
            ",
        )
        .bind(id)
        .bind(changes.name)
        .bind(changes.description)
        .bind(changes.price.map(|p| p.amount()))
        .bind(brand)
        .bind(clear_brand)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| RepositoryError::from_write(e, "product already exists"))?;

        if updated.is_none() {
            return Ok(None);
        }

        if let Some(categories) = changes.categories {
            ProductLink::Categories
                .replace(&mut tx, id, &ids(&categories))
                .await?;
        }
        if let Some(tags) = changes.tags {
            ProductLink::Tags
                .replace(&mut tx, id, &ids(&tags))
                .await?;
        }

        let product = load_product(&mut tx, id).await?;
        tx.commit().await?;

        Ok(product)
    }

    async fn delete_product(&self, id: ProductId) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM catalog.product WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn list_attributes(
        &self,
        product: ProductId,
    ) -> Result<Vec<Attribute>, RepositoryError> {
        let rows: Vec<AttributeRow> = sqlx::query_as(
            "SELECT id, product_id, name, value FROM catalog.attribute \
             WHERE product_id = $1 ORDER BY id",
        )
        .bind(product)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Attribute::from).collect())
    }

    async fn get_attribute(&self, id: AttributeId) -> Result<Option<Attribute>, RepositoryError> {
        let row: Option<AttributeRow> = sqlx::query_as(
            "SELECT id, product_id, name, value FROM catalog.attribute WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Attribute::from))
    }

    async fn create_attribute(
        &self,
        attribute: NewAttribute,
    ) -> Result<Attribute, RepositoryError> {
        let row: AttributeRow = sqlx::query_as(
            r"
            INSERT INTO catalog.attribute (product_id, name, value)
            VALUES ($1, $2, $3)
            RETURNING id, product_id, name, value
            ",
        )
        .bind(attribute.product)
        .bind(&attribute.name)
        .bind(&attribute.value)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| RepositoryError::from_write(e, "attribute already exists"))?;

        Ok(row.into())
    }

    async fn delete_attribute(&self, id: AttributeId) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM catalog.attribute WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn list_carts(&self) -> Result<Vec<Cart>, RepositoryError> {
        let rows: Vec<CartRow> =
            sqlx::query_as("SELECT id, user_id, created_at FROM catalog.cart ORDER BY id")
                .fetch_all(&self.pool)
                .await?;

        Ok(rows.into_iter().map(Cart::from).collect())
    }

    async fn get_cart(&self, id: CartId) -> Result<Option<Cart>, RepositoryError> {
        let row: Option<CartRow> =
            sqlx::query_as("SELECT id, user_id, created_at FROM catalog.cart WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        Ok(row.map(Cart::from))
    }

    async fn create_cart(&self, user: UserId) -> Result<Cart, RepositoryError> {
        let row: CartRow = sqlx::query_as(
            "INSERT INTO catalog.cart (user_id) VALUES ($1) RETURNING id, user_id, created_at",
        )
        .bind(user)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| RepositoryError::from_write(e, "cart with this user already exists."))?;

        Ok(row.into())
    }

    async fn delete_cart(&self, id: CartId) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM catalog.cart WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
