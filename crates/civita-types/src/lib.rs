//! Civita Types - Core type definitions for the CIVITA funding engine.
//!
//! This crate provides the fundamental types used throughout CIVITA:
//! - Addresses (20-byte, Bech32m encoded)
//! - Roles and the explicit authorization context
//! - Shared type errors

pub mod address;
pub mod auth;
pub mod error;

pub use address::Address;
pub use auth::{AuthContext, AuthError, Role};
pub use error::TypesError;
