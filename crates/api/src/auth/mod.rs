//! Authentication primitives.
//!
//! - [`password`] -- Argon2id password hashing and verification.
//! - [`jwt`] -- JWT access tokens and refresh-token helpers.
//! - [`cookie`] -- the `access_token` cookie used by browser clients.

pub mod cookie;
pub mod jwt;
pub mod password;
