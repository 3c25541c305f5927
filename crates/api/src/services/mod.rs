//! Business logic services.
//!
//! # Services
//!
//! - `auth` - Password hashing and username/password authentication

pub mod auth;
