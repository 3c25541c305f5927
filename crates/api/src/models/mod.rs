//! Domain models for the API.
//!
//! These types represent validated domain objects, separate from database row
//! types and from request payloads.

pub mod blog;
pub mod catalog;
pub mod session;
pub mod user;

pub use blog::{Blog, BlogChanges, NewBlog};
pub use catalog::{
    Attribute, Brand, Cart, Category, LookupEntity, LookupKind, LookupRecord, NewAttribute,
    NewProduct, Product, ProductChanges, Tag,
};
pub use session::{CurrentUser, keys as session_keys};
pub use user::{NewUser, User, UserChanges};
