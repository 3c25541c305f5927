//! Catalog route handlers: brands, categories, tags, products, attributes
//! and carts.
//!
//! All catalog endpoints apply the configured default policy.

use axum::{Json, extract::State, http::StatusCode};
use tracing::instrument;

use bazaar_core::{AttributeId, CartId, ProductId};

use super::{JsonBody, PathId};
use crate::db::RepositoryError;
use crate::error::{AppError, Result, add_breadcrumb};
use crate::middleware::DefaultPolicy;
use crate::models::{Attribute, Cart, LookupEntity, Product};
use crate::serializers::{FieldErrors, Mode, catalog};
use crate::state::AppState;

// =============================================================================
// Brands, categories and tags
// =============================================================================

/// List every row of `L`'s table.
#[instrument(skip_all, fields(kind = L::KIND.label()))]
pub async fn list_lookups<L: LookupEntity>(
    State(state): State<AppState>,
    _caller: DefaultPolicy,
) -> Result<Json<Vec<L>>> {
    let rows = state.catalog().list_lookups(L::KIND).await?;
    Ok(Json(rows.into_iter().map(L::from).collect()))
}

/// Create a row from `{name}`.
#[instrument(skip_all, fields(kind = L::KIND.label()))]
pub async fn create_lookup<L: LookupEntity>(
    State(state): State<AppState>,
    _caller: DefaultPolicy,
    body: JsonBody,
) -> Result<(StatusCode, Json<L>)> {
    let name = catalog::validate_lookup(&body.payload(Mode::Full)?)?;
    let record = state.catalog().create_lookup(L::KIND, &name).await?;

    tracing::info!(kind = L::KIND.label(), id = record.id, "Catalog entry created");
    Ok((StatusCode::CREATED, Json(L::from(record))))
}

#[instrument(skip_all, fields(kind = L::KIND.label(), lookup_id = id))]
pub async fn show_lookup<L: LookupEntity>(
    State(state): State<AppState>,
    _caller: DefaultPolicy,
    PathId(id): PathId<i32>,
) -> Result<Json<L>> {
    state
        .catalog()
        .get_lookup(L::KIND, id)
        .await?
        .map(|record| Json(L::from(record)))
        .ok_or(AppError::NotFound)
}

/// Rename a row from `{name}`.
#[instrument(skip_all, fields(kind = L::KIND.label(), lookup_id = id))]
pub async fn rename_lookup<L: LookupEntity>(
    State(state): State<AppState>,
    _caller: DefaultPolicy,
    PathId(id): PathId<i32>,
    body: JsonBody,
) -> Result<Json<L>> {
    if state.catalog().get_lookup(L::KIND, id).await?.is_none() {
        return Err(AppError::NotFound);
    }
    let name = catalog::validate_lookup(&body.payload(Mode::Full)?)?;
    state
        .catalog()
        .rename_lookup(L::KIND, id, &name)
        .await?
        .map(|record| Json(L::from(record)))
        .ok_or(AppError::NotFound)
}

/// Delete a row. A brand still used by a product answers `409`.
#[instrument(skip_all, fields(kind = L::KIND.label(), lookup_id = id))]
pub async fn delete_lookup<L: LookupEntity>(
    State(state): State<AppState>,
    _caller: DefaultPolicy,
    PathId(id): PathId<i32>,
) -> Result<StatusCode> {
    if !state.catalog().delete_lookup(L::KIND, id).await? {
        return Err(AppError::NotFound);
    }

    tracing::info!(kind = L::KIND.label(), id, "Catalog entry deleted");
    Ok(StatusCode::NO_CONTENT)
}

// =============================================================================
// Products
// =============================================================================

/// List all products.
#[instrument(skip_all)]
pub async fn list_products(
    State(state): State<AppState>,
    _caller: DefaultPolicy,
) -> Result<Json<Vec<Product>>> {
    Ok(Json(state.catalog().list_products().await?))
}

/// Create a product.
#[instrument(skip_all)]
pub async fn create_product(
    State(state): State<AppState>,
    _caller: DefaultPolicy,
    body: JsonBody,
) -> Result<(StatusCode, Json<Product>)> {
    let payload = body.payload(Mode::Full)?;
    let new_product = catalog::validate_new_product(&payload, state.catalog()).await?;
    let product = state.catalog().create_product(new_product).await?;

    tracing::info!(product_id = %product.id, "Product created");
    Ok((StatusCode::CREATED, Json(product)))
}

#[instrument(skip_all, fields(product_id = %id))]
pub async fn show_product(
    State(state): State<AppState>,
    _caller: DefaultPolicy,
    PathId(id): PathId<ProductId>,
) -> Result<Json<Product>> {
    state
        .catalog()
        .get_product(id)
        .await?
        .map(Json)
        .ok_or(AppError::NotFound)
}

#[instrument(skip_all, fields(product_id = %id))]
pub async fn replace_product(
    State(state): State<AppState>,
    _caller: DefaultPolicy,
    PathId(id): PathId<ProductId>,
    body: JsonBody,
) -> Result<Json<Product>> {
    update_product(&state, id, body, Mode::Full).await
}

#[instrument(skip_all, fields(product_id = %id))]
pub async fn patch_product(
    State(state): State<AppState>,
    _caller: DefaultPolicy,
    PathId(id): PathId<ProductId>,
    body: JsonBody,
) -> Result<Json<Product>> {
    update_product(&state, id, body, Mode::Partial).await
}

async fn update_product(
    state: &AppState,
    id: ProductId,
    body: JsonBody,
    mode: Mode,
) -> Result<Json<Product>> {
    if state.catalog().get_product(id).await?.is_none() {
        return Err(AppError::NotFound);
    }
    let payload = body.payload(mode)?;
    // Optional fields left out of a PUT keep their stored values.
    let changes = catalog::validate_product(&payload, state.catalog()).await?;
    let product = state
        .catalog()
        .update_product(id, changes)
        .await?
        .ok_or(AppError::NotFound)?;

    tracing::info!(product_id = %product.id, "Product updated");
    Ok(Json(product))
}

/// Delete a product and its attributes.
#[instrument(skip_all, fields(product_id = %id))]
pub async fn delete_product(
    State(state): State<AppState>,
    _caller: DefaultPolicy,
    PathId(id): PathId<ProductId>,
) -> Result<StatusCode> {
    if !state.catalog().delete_product(id).await? {
        return Err(AppError::NotFound);
    }

    tracing::info!(product_id = %id, "Product deleted");
    let product_id = id.to_string();
    add_breadcrumb("catalog", "Deleted product", Some(&[("product_id", product_id.as_str())]));
    Ok(StatusCode::NO_CONTENT)
}

// =============================================================================
// Attributes
// =============================================================================

/// List the attributes of a product.
#[instrument(skip_all, fields(product_id = %product))]
pub async fn list_attributes(
    State(state): State<AppState>,
    _caller: DefaultPolicy,
    PathId(product): PathId<ProductId>,
) -> Result<Json<Vec<Attribute>>> {
    if state.catalog().get_product(product).await?.is_none() {
        return Err(AppError::NotFound);
    }
    Ok(Json(state.catalog().list_attributes(product).await?))
}

/// Attach `{name, value}` to a product.
#[instrument(skip_all, fields(product_id = %product))]
pub async fn create_attribute(
    State(state): State<AppState>,
    _caller: DefaultPolicy,
    PathId(product): PathId<ProductId>,
    body: JsonBody,
) -> Result<(StatusCode, Json<Attribute>)> {
    if state.catalog().get_product(product).await?.is_none() {
        return Err(AppError::NotFound);
    }
    let attribute = catalog::validate_attribute(&body.payload(Mode::Full)?, product)?;
    let attribute = state.catalog().create_attribute(attribute).await?;

    tracing::info!(attribute_id = %attribute.id, product_id = %product, "Attribute created");
    Ok((StatusCode::CREATED, Json(attribute)))
}

#[instrument(skip_all, fields(attribute_id = %id))]
pub async fn show_attribute(
    State(state): State<AppState>,
    _caller: DefaultPolicy,
    PathId(id): PathId<AttributeId>,
) -> Result<Json<Attribute>> {
    state
        .catalog()
        .get_attribute(id)
        .await?
        .map(Json)
        .ok_or(AppError::NotFound)
}

#[instrument(skip_all, fields(attribute_id = %id))]
pub async fn delete_attribute(
    State(state): State<AppState>,
    _caller: DefaultPolicy,
    PathId(id): PathId<AttributeId>,
) -> Result<StatusCode> {
    if !state.catalog().delete_attribute(id).await? {
        return Err(AppError::NotFound);
    }
    tracing::info!(attribute_id = %id, "Attribute deleted");
    Ok(StatusCode::NO_CONTENT)
}

// =============================================================================
// Carts
// =============================================================================

#[instrument(skip_all)]
pub async fn list_carts(
    State(state): State<AppState>,
    _caller: DefaultPolicy,
) -> Result<Json<Vec<Cart>>> {
    Ok(Json(state.catalog().list_carts().await?))
}

/// Create the cart of `{user}`. A user owns at most one.
#[instrument(skip_all)]
pub async fn create_cart(
    State(state): State<AppState>,
    _caller: DefaultPolicy,
    body: JsonBody,
) -> Result<(StatusCode, Json<Cart>)> {
    let payload = body.payload(Mode::Full)?;
    let user = catalog::validate_cart(&payload, state.users()).await?;
    let cart = state
        .catalog()
        .create_cart(user)
        .await
        .map_err(|err| match err {
            RepositoryError::Conflict(_) => FieldErrors::single("user", catalog::CART_EXISTS).into(),
            other => AppError::from(other),
        })?;

    tracing::info!(cart_id = %cart.id, user_id = %user, "Cart created");
    Ok((StatusCode::CREATED, Json(cart)))
}

#[instrument(skip_all, fields(cart_id = %id))]
pub async fn show_cart(
    State(state): State<AppState>,
    _caller: DefaultPolicy,
    PathId(id): PathId<CartId>,
) -> Result<Json<Cart>> {
    state
        .catalog()
        .get_cart(id)
        .await?
        .map(Json)
        .ok_or(AppError::NotFound)
}

#[instrument(skip_all, fields(cart_id = %id))]
pub async fn delete_cart(
    State(state): State<AppState>,
    _caller: DefaultPolicy,
    PathId(id): PathId<CartId>,
) -> Result<StatusCode> {
    if !state.catalog().delete_cart(id).await? {
        return Err(AppError::NotFound);
    }
    tracing::info!(cart_id = %id, "Cart deleted");
    Ok(StatusCode::NO_CONTENT)
}
