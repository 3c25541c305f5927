//! Catalog payloads.

use bazaar_core::{BrandId, CategoryId, Price, ProductId, TagId, UserId};

use super::{FieldErrors, Mode, Payload, Text, messages};
use crate::db::{CatalogStore, UserStore};
use crate::error::AppError;
use crate::models::{LookupKind, NewAttribute, NewProduct, ProductChanges, catalog::NAME_MAX_LENGTH};

/// Longest accepted attribute value.
pub const VALUE_MAX_LENGTH: usize = 255;

/// Validate `{name}` for a brand, category or tag.
///
/// # Errors
///
/// Returns `AppError::Validation` if the name is missing, blank or too long.
pub fn validate_lookup(payload: &Payload) -> Result<String, AppError> {
    let mut errors = FieldErrors::new();
    let name = payload.text(&mut errors, "name", Text::required(Some(NAME_MAX_LENGTH)));
    errors.check()?;
    name.ok_or_else(|| AppError::Internal("lookup validation left name unset".to_owned()))
}

/// Report the first id in `ids` with no row in `kind`'s table.
async fn check_lookups(
    errors: &mut FieldErrors,
    catalog: &dyn CatalogStore,
    kind: LookupKind,
    field: &str,
    ids: &[i32],
) -> Result<(), AppError> {
    if ids.is_empty() {
        return Ok(());
    }
    if let Some(&missing) = catalog.missing_lookups(kind, ids).await?.first() {
        errors.add(field, messages::does_not_exist(missing));
    }
    Ok(())
}

/// Validate a product payload.
///
/// With [`Mode::Full`], `name` and `price` are mandatory; `description`,
/// `brand`, `categories` and `tags` are optional.
///
/// # Errors
///
/// Returns `AppError::Validation` for field errors, including references to
/// brands, categories or tags that do not exist.
pub async fn validate_product(
    payload: &Payload,
    catalog: &dyn CatalogStore,
) -> Result<ProductChanges, AppError> {
    let mut errors = FieldErrors::new();

    let name = payload.text(&mut errors, "name", Text::required(Some(NAME_MAX_LENGTH)));
    let description = payload.text(&mut errors, "description", Text::optional(None));
    let price = payload
        .number(&mut errors, "price", true)
        .and_then(|raw| match Price::parse(&raw) {
            Ok(price) => Some(price),
            Err(err) => {
                errors.add("price", err.to_string());
                None
            }
        });
    let brand = payload.pk(&mut errors, "brand", false, true);
    let categories = payload.pk_list(&mut errors, "categories");
    let tags = payload.pk_list(&mut errors, "tags");

    if let Some(Some(pk)) = brand {
        check_lookups(&mut errors, catalog, LookupKind::Brand, "brand", &[pk]).await?;
    }
    if let Some(ids) = &categories {
        check_lookups(&mut errors, catalog, LookupKind::Category, "categories", ids).await?;
    }
    if let Some(ids) = &tags {
        check_lookups(&mut errors, catalog, LookupKind::Tag, "tags", ids).await?;
    }

    errors.check()?;
    Ok(ProductChanges {
        name,
        description,
        price,
        brand: brand.map(|b| b.map(BrandId::new)),
        categories: categories.map(|ids| ids.into_iter().map(CategoryId::new).collect()),
        tags: tags.map(|ids| ids.into_iter().map(TagId::new).collect()),
    })
}

/// Validate a product payload for insertion.
///
/// # Errors
///
/// See [`validate_product`].
pub async fn validate_new_product(
    payload: &Payload,
    catalog: &dyn CatalogStore,
) -> Result<NewProduct, AppError> {
    debug_assert_eq!(payload.mode(), Mode::Full);
    let changes = validate_product(payload, catalog).await?;
    let (Some(name), Some(price)) = (changes.name, changes.price) else {
        return Err(AppError::Internal(
            "full product validation left fields unset".to_owned(),
        ));
    };

    Ok(NewProduct {
        name,
        description: changes.description.unwrap_or_default(),
        price,
        brand: changes.brand.flatten(),
        categories: changes.categories.unwrap_or_default(),
        tags: changes.tags.unwrap_or_default(),
    })
}

/// Validate `{name, value}` for an attribute of `product`.
///
/// # Errors
///
/// Returns `AppError::Validation` if either field is missing, blank or too
/// long.
pub fn validate_attribute(payload: &Payload, product: ProductId) -> Result<NewAttribute, AppError> {
    let mut errors = FieldErrors::new();
    let name = payload.text(&mut errors, "name", Text::required(Some(NAME_MAX_LENGTH)));
    let value = payload.text(&mut errors, "value", Text::required(Some(VALUE_MAX_LENGTH)));
    errors.check()?;

    let (Some(name), Some(value)) = (name, value) else {
        return Err(AppError::Internal(
            "attribute validation left fields unset".to_owned(),
        ));
    };
    Ok(NewAttribute {
        product,
        name,
        value,
    })
}

/// Message for a second cart on the same user.
pub const CART_EXISTS: &str = "cart with this user already exists.";

/// Validate `{user}` for a new cart.
///
/// # Errors
///
/// Returns `AppError::Validation` if the user is missing or does not exist.
pub async fn validate_cart(payload: &Payload, users: &dyn UserStore) -> Result<UserId, AppError> {
    let mut errors = FieldErrors::new();
    let user = payload.pk(&mut errors, "user", true, false).flatten();

    if let Some(pk) = user
        && users.get(UserId::new(pk)).await?.is_none()
    {
        errors.add("user", messages::does_not_exist(pk));
    }

    errors.check()?;
    user.map(UserId::new)
        .ok_or_else(|| AppError::Internal("cart validation left user unset".to_owned()))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rust_decimal::Decimal;
    use serde_json::json;

    use super::*;
    use crate::db::MemoryDatabase;

    fn errors_of(result: Result<impl std::fmt::Debug, AppError>) -> FieldErrors {
        match result {
            Err(AppError::Validation(errors)) => errors,
            other => panic!("expected validation errors, got {other:?}"),
        }
    }

    #[test]
    fn test_lookup_name() {
        let payload = Payload::new(json!({"name": "Acme"}), Mode::Full).unwrap();
        assert_eq!(validate_lookup(&payload).unwrap(), "Acme");

        let payload = Payload::new(json!({"name": ""}), Mode::Full).unwrap();
        let errors = errors_of(validate_lookup(&payload));
        assert_eq!(errors.get("name"), [messages::BLANK]);
    }

    #[tokio::test]
    async fn test_product_defaults() {
        let db = MemoryDatabase::new();
        let payload =
            Payload::new(json!({"name": "Lamp", "price": "12.5"}), Mode::Full).unwrap();
        let product = validate_new_product(&payload, &db).await.unwrap();

        assert_eq!(product.price.amount(), Decimal::new(1250, 2));
        assert_eq!(product.description, "");
        assert_eq!(product.brand, None);
        assert!(product.categories.is_empty());
        assert!(product.tags.is_empty());
    }

    #[tokio::test]
    async fn test_product_references_must_exist() {
        let db = MemoryDatabase::new();
        let category = db.create_lookup(LookupKind::Category, "Home").await.unwrap();
        let payload = Payload::new(
            json!({
                "name": "Lamp",
                "price": 10,
                "brand": 5,
                "categories": [category.id, 8],
                "tags": ["x"],
            }),
            Mode::Full,
        )
        .unwrap();

        let errors = errors_of(validate_new_product(&payload, &db).await);
        assert_eq!(errors.get("brand"), ["Invalid pk \"5\" - object does not exist."]);
        assert_eq!(
            errors.get("categories"),
            ["Invalid pk \"8\" - object does not exist."]
        );
        assert_eq!(
            errors.get("tags"),
            ["Incorrect type. Expected pk value, received str."]
        );
    }

    #[tokio::test]
    async fn test_product_price_rules() {
        let db = MemoryDatabase::new();
        for (price, message) in [
            (json!(-1), "Ensure this value is greater than or equal to 0."),
            (json!("1.234"), "Ensure that there are no more than 2 decimal places."),
            (
                json!("1.0000000000000000000000000000001"),
                "Ensure that there are no more than 2 decimal places.",
            ),
            (json!("cheap"), "A valid number is required."),
            (
                json!("123456789"),
                "Ensure that there are no more than 10 digits in total.",
            ),
        ] {
            let payload =
                Payload::new(json!({"name": "Lamp", "price": price}), Mode::Full).unwrap();
            let errors = errors_of(validate_new_product(&payload, &db).await);
            assert_eq!(errors.get("price"), [message]);
        }
    }

    #[tokio::test]
    async fn test_product_patch_clears_brand() {
        let db = MemoryDatabase::new();
        let payload = Payload::new(json!({"brand": null}), Mode::Partial).unwrap();
        let changes = validate_product(&payload, &db).await.unwrap();
        assert_eq!(changes.brand, Some(None));
        assert_eq!(changes.name, None);
    }

    #[test]
    fn test_attribute_fields_required() {
        let payload = Payload::new(json!({"name": "color"}), Mode::Full).unwrap();
        let errors = errors_of(validate_attribute(&payload, ProductId::new(1)));
        assert_eq!(errors.get("value"), [messages::REQUIRED]);
    }

    #[tokio::test]
    async fn test_cart_user_must_exist() {
        let db = MemoryDatabase::new();
        let payload = Payload::new(json!({"user": 3}), Mode::Full).unwrap();
        let errors = errors_of(validate_cart(&payload, &db).await);
        assert_eq!(errors.get("user"), ["Invalid pk \"3\" - object does not exist."]);
    }
}
