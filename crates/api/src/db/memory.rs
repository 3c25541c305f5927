//! Process-local storage.
//!
//! Every table lives behind one [`tokio::sync::RwLock`], so each operation
//! (including a delete and its cascades) is atomic with respect to the others.
//! Ids come from per-table counters and are never reused, like `SERIAL`.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use bazaar_core::{AttributeId, BlogId, CartId, ProductId, UserId, Username};

use super::{BlogStore, CatalogStore, RepositoryError, UserStore};
use crate::models::{
    Attribute, Blog, BlogChanges, Cart, LookupKind, LookupRecord, NewAttribute, NewBlog,
    NewProduct, NewUser, Product, ProductChanges, User, UserChanges,
};

/// A table with a `SERIAL`-like id sequence.
#[derive(Debug)]
struct Table<T> {
    rows: BTreeMap<i32, T>,
    last_id: i32,
}

impl<T> Default for Table<T> {
    fn default() -> Self {
        Self {
            rows: BTreeMap::new(),
            last_id: 0,
        }
    }
}

impl<T> Table<T> {
    fn next_id(&mut self) -> i32 {
        self.last_id += 1;
        self.last_id
    }

    fn values(&self) -> impl Iterator<Item = &T> {
        self.rows.values()
    }
}

#[derive(Debug, Default)]
struct Tables {
    users: Table<(User, String)>,
    blogs: Table<Blog>,
    brands: Table<String>,
    categories: Table<String>,
    tags: Table<String>,
    products: Table<Product>,
    attributes: Table<Attribute>,
    carts: Table<Cart>,
}

impl Tables {
    fn lookup(&self, kind: LookupKind) -> &Table<String> {
        match kind {
            LookupKind::Brand => &self.brands,
            LookupKind::Category => &self.categories,
            LookupKind::Tag => &self.tags,
        }
    }

    fn lookup_mut(&mut self, kind: LookupKind) -> &mut Table<String> {
        match kind {
            LookupKind::Brand => &mut self.brands,
            LookupKind::Category => &mut self.categories,
            LookupKind::Tag => &mut self.tags,
        }
    }

    fn username_taken(&self, username: &Username, except: Option<UserId>) -> bool {
        self.users
            .values()
            .any(|(u, _)| &u.username == username && Some(u.id) != except)
    }

    fn require_user(&self, id: UserId) -> Result<(), RepositoryError> {
        if self.users.rows.contains_key(&id.as_i32()) {
            Ok(())
        } else {
            Err(RepositoryError::Conflict(format!("user {id} does not exist")))
        }
    }

    fn require_lookups(
        &self,
        kind: LookupKind,
        ids: impl IntoIterator<Item = i32>,
    ) -> Result<(), RepositoryError> {
        let table = self.lookup(kind);
        match ids.into_iter().find(|id| !table.rows.contains_key(id)) {
            Some(id) => Err(RepositoryError::Conflict(format!(
                "{} {id} does not exist",
                kind.label()
            ))),
            None => Ok(()),
        }
    }

    fn check_product_refs(
        &self,
        brand: Option<i32>,
        categories: &[bazaar_core::CategoryId],
        tags: &[bazaar_core::TagId],
    ) -> Result<(), RepositoryError> {
        self.require_lookups(LookupKind::Brand, brand)?;
        self.require_lookups(LookupKind::Category, categories.iter().map(|c| c.as_i32()))?;
        self.require_lookups(LookupKind::Tag, tags.iter().map(|t| t.as_i32()))
    }
}

fn normalized<T: Ord>(mut values: Vec<T>) -> Vec<T> {
    values.sort();
    values.dedup();
    values
}

/// In-memory implementation of every store trait.
#[derive(Debug, Default)]
pub struct MemoryDatabase {
    tables: RwLock<Tables>,
}

impl MemoryDatabase {
    /// Create an empty database.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStore for MemoryDatabase {
    async fn list(&self) -> Result<Vec<User>, RepositoryError> {
        let tables = self.tables.read().await;
        Ok(tables.users.values().map(|(u, _)| u.clone()).collect())
    }

    async fn get(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        let tables = self.tables.read().await;
        Ok(tables.users.rows.get(&id.as_i32()).map(|(u, _)| u.clone()))
    }

    async fn get_by_username(
        &self,
        username: &Username,
    ) -> Result<Option<User>, RepositoryError> {
        let tables = self.tables.read().await;
        Ok(tables
            .users
            .values()
            .find(|(u, _)| &u.username == username)
            .map(|(u, _)| u.clone()))
    }

    async fn credentials(
        &self,
        username: &Username,
    ) -> Result<Option<(User, String)>, RepositoryError> {
        let tables = self.tables.read().await;
        Ok(tables
            .users
            .values()
            .find(|(u, _)| &u.username == username)
            .cloned())
    }

    async fn create(&self, user: NewUser) -> Result<User, RepositoryError> {
        let mut tables = self.tables.write().await;
        if tables.username_taken(&user.username, None) {
            return Err(RepositoryError::Conflict(
                "username already exists".to_owned(),
            ));
        }

        let id = tables.users.next_id();
        let created = User {
            id: UserId::new(id),
            username: user.username,
            email: user.email,
            first_name: user.first_name,
            last_name: user.last_name,
            is_staff: user.is_staff,
            is_active: true,
            date_joined: Utc::now(),
            last_login: None,
        };
        tables
            .users
            .rows
            .insert(id, (created.clone(), user.password_hash));
        Ok(created)
    }

    async fn update(
        &self,
        id: UserId,
        changes: UserChanges,
    ) -> Result<Option<User>, RepositoryError> {
        let mut tables = self.tables.write().await;
        if let Some(username) = &changes.username
            && tables.username_taken(username, Some(id))
        {
            return Err(RepositoryError::Conflict(
                "username already exists".to_owned(),
            ));
        }

        let Some((user, hash)) = tables.users.rows.get_mut(&id.as_i32()) else {
            return Ok(None);
        };
        if let Some(password_hash) = changes.password_hash.clone() {
            *hash = password_hash;
        }
        user.apply(changes);
        Ok(Some(user.clone()))
    }

    async fn delete(&self, id: UserId) -> Result<bool, RepositoryError> {
        let mut tables = self.tables.write().await;
        if tables.users.rows.remove(&id.as_i32()).is_none() {
            return Ok(false);
        }
        tables.blogs.rows.retain(|_, b| b.author != id);
        tables.carts.rows.retain(|_, c| c.user != id);
        Ok(true)
    }

    async fn record_login(&self, id: UserId) -> Result<(), RepositoryError> {
        let mut tables = self.tables.write().await;
        let (user, _) = tables
            .users
            .rows
            .get_mut(&id.as_i32())
            .ok_or(RepositoryError::NotFound)?;
        user.last_login = Some(Utc::now());
        Ok(())
    }
}

#[async_trait]
impl BlogStore for MemoryDatabase {
    async fn list(&self) -> Result<Vec<Blog>, RepositoryError> {
        let tables = self.tables.read().await;
        Ok(tables.blogs.values().cloned().collect())
    }

    async fn get(&self, id: BlogId) -> Result<Option<Blog>, RepositoryError> {
        let tables = self.tables.read().await;
        Ok(tables.blogs.rows.get(&id.as_i32()).cloned())
    }

    async fn create(&self, blog: NewBlog) -> Result<Blog, RepositoryError> {
        let mut tables = self.tables.write().await;
        tables.require_user(blog.author)?;

        let id = tables.blogs.next_id();
        let created = Blog {
            id: BlogId::new(id),
            title: blog.title,
            context: blog.context,
            author: blog.author,
        };
        tables.blogs.rows.insert(id, created.clone());
        Ok(created)
    }

    async fn update(
        &self,
        id: BlogId,
        changes: BlogChanges,
    ) -> Result<Option<Blog>, RepositoryError> {
        let mut tables = self.tables.write().await;
        if let Some(author) = changes.author {
            tables.require_user(author)?;
        }

        let Some(blog) = tables.blogs.rows.get_mut(&id.as_i32()) else {
            return Ok(None);
        };
        blog.apply(changes);
        Ok(Some(blog.clone()))
    }

    async fn delete(&self, id: BlogId) -> Result<bool, RepositoryError> {
        let mut tables = self.tables.write().await;
        Ok(tables.blogs.rows.remove(&id.as_i32()).is_some())
    }
}

#[async_trait]
impl CatalogStore for MemoryDatabase {
    async fn list_lookups(&self, kind: LookupKind) -> Result<Vec<LookupRecord>, RepositoryError> {
        let tables = self.tables.read().await;
        Ok(tables
            .lookup(kind)
            .rows
            .iter()
            .map(|(&id, name)| LookupRecord {
                id,
                name: name.clone(),
            })
            .collect())
    }

    async fn get_lookup(
        &self,
        kind: LookupKind,
        id: i32,
    ) -> Result<Option<LookupRecord>, RepositoryError> {
        let tables = self.tables.read().await;
        Ok(tables
            .lookup(kind)
            .rows
            .get(&id)
            .map(|name| LookupRecord {
                id,
                name: name.clone(),
            }))
    }

    async fn missing_lookups(
        &self,
        kind: LookupKind,
        ids: &[i32],
    ) -> Result<Vec<i32>, RepositoryError> {
        let tables = self.tables.read().await;
        let table = tables.lookup(kind);
        Ok(ids
            .iter()
            .copied()
            .filter(|id| !table.rows.contains_key(id))
            .collect())
    }

    async fn create_lookup(
        &self,
        kind: LookupKind,
        name: &str,
    ) -> Result<LookupRecord, RepositoryError> {
        let mut tables = self.tables.write().await;
        let table = tables.lookup_mut(kind);
        let id = table.next_id();
        table.rows.insert(id, name.to_owned());
        Ok(LookupRecord {
            id,
            name: name.to_owned(),
        })
    }

    async fn rename_lookup(
        &self,
        kind: LookupKind,
        id: i32,
        name: &str,
    ) -> Result<Option<LookupRecord>, RepositoryError> {
        let mut tables = self.tables.write().await;
        let Some(current) = tables.lookup_mut(kind).rows.get_mut(&id) else {
            return Ok(None);
        };
        name.clone_into(current);
        Ok(Some(LookupRecord {
            id,
            name: name.to_owned(),
        }))
    }

    async fn delete_lookup(&self, kind: LookupKind, id: i32) -> Result<bool, RepositoryError> {
        let mut tables = self.tables.write().await;
        if !tables.lookup(kind).rows.contains_key(&id) {
            return Ok(false);
        }

        match kind {
            LookupKind::Brand => {
                if tables
                    .products
                    .values()
                    .any(|p| p.brand.map(|b| b.as_i32()) == Some(id))
                {
                    return Err(RepositoryError::Protected(
                        "brand is referenced by products".to_owned(),
                    ));
                }
            }
            LookupKind::Category => {
                for product in tables.products.rows.values_mut() {
                    product.categories.retain(|c| c.as_i32() != id);
                }
            }
            LookupKind::Tag => {
                for product in tables.products.rows.values_mut() {
                    product.tags.retain(|t| t.as_i32() != id);
                }
            }
        }

        tables.lookup_mut(kind).rows.remove(&id);
        Ok(true)
    }

    async fn list_products(&self) -> Result<Vec<Product>, RepositoryError> {
        let tables = self.tables.read().await;
        Ok(tables.products.values().cloned().collect())
    }

    async fn get_product(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        let tables = self.tables.read().await;
        Ok(tables.products.rows.get(&id.as_i32()).cloned())
    }

    async fn create_product(&self, product: NewProduct) -> Result<Product, RepositoryError> {
        let mut tables = self.tables.write().await;
        tables.check_product_refs(
            product.brand.map(|b| b.as_i32()),
            &product.categories,
            &product.tags,
        )?;

        let id = tables.products.next_id();
        let created = Product {
            id: ProductId::new(id),
            name: product.name,
            description: product.description,
            price: product.price,
            brand: product.brand,
            categories: normalized(product.categories),
            tags: normalized(product.tags),
        };
        tables.products.rows.insert(id, created.clone());
        Ok(created)
    }

    async fn update_product(
        &self,
        id: ProductId,
        mut changes: ProductChanges,
    ) -> Result<Option<Product>, RepositoryError> {
        let mut tables = self.tables.write().await;
        tables.check_product_refs(
            changes.brand.flatten().map(|b| b.as_i32()),
            changes.categories.as_deref().unwrap_or_default(),
            changes.tags.as_deref().unwrap_or_default(),
        )?;
        changes.categories = changes.categories.map(normalized);
        changes.tags = changes.tags.map(normalized);

        let Some(product) = tables.products.rows.get_mut(&id.as_i32()) else {
            return Ok(None);
        };
        product.apply(changes);
        Ok(Some(product.clone()))
    }

    async fn delete_product(&self, id: ProductId) -> Result<bool, RepositoryError> {
        let mut tables = self.tables.write().await;
        if tables.products.rows.remove(&id.as_i32()).is_none() {
            return Ok(false);
        }
        tables.attributes.rows.retain(|_, a| a.product != id);
        Ok(true)
    }

    async fn list_attributes(
        &self,
        product: ProductId,
    ) -> Result<Vec<Attribute>, RepositoryError> {
        let tables = self.tables.read().await;
        Ok(tables
            .attributes
            .values()
            .filter(|a| a.product == product)
            .cloned()
            .collect())
    }

    async fn get_attribute(&self, id: AttributeId) -> Result<Option<Attribute>, RepositoryError> {
        let tables = self.tables.read().await;
        Ok(tables.attributes.rows.get(&id.as_i32()).cloned())
    }

    async fn create_attribute(
        &self,
        attribute: NewAttribute,
    ) -> Result<Attribute, RepositoryError> {
        let mut tables = self.tables.write().await;
        if !tables.products.rows.contains_key(&attribute.product.as_i32()) {
            return Err(RepositoryError::Conflict(format!(
                "product {} does not exist",
                attribute.product
            )));
        }

        let id = tables.attributes.next_id();
        let created = Attribute {
            id: AttributeId::new(id),
            product: attribute.product,
            name: attribute.name,
            value: attribute.value,
        };
        tables.attributes.rows.insert(id, created.clone());
        Ok(created)
    }

    async fn delete_attribute(&self, id: AttributeId) -> Result<bool, RepositoryError> {
        let mut tables = self.tables.write().await;
        Ok(tables.attributes.rows.remove(&id.as_i32()).is_some())
    }

    async fn list_carts(&self) -> Result<Vec<Cart>, RepositoryError> {
        let tables = self.tables.read().await;
        Ok(tables.carts.values().cloned().collect())
    }

    async fn get_cart(&self, id: CartId) -> Result<Option<Cart>, RepositoryError> {
        let tables = self.tables.read().await;
        Ok(tables.carts.rows.get(&id.as_i32()).cloned())
    }

    async fn create_cart(&self, user: UserId) -> Result<Cart, RepositoryError> {
        let mut tables = self.tables.write().await;
        tables.require_user(user)?;
        if tables.carts.values().any(|c| c.user == user) {
            return Err(RepositoryError::Conflict(
                "cart with this user already exists.".to_owned(),
            ));
        }

        let id = tables.carts.next_id();
        let created = Cart {
            id: CartId::new(id),
            user,
            created_at: Utc::now(),
        };
        tables.carts.rows.insert(id, created.clone());
        Ok(created)
    }

    async fn delete_cart(&self, id: CartId) -> Result<bool, RepositoryError> {
        let mut tables = self.tables.write().await;
        Ok(tables.carts.rows.remove(&id.as_i32()).is_some())
    }
}
