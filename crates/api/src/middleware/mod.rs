//! Authentication and authorization extractors.
//!
//! - [`auth::AuthUser`] -- the authenticated account, from a bearer token or cookie.
//! - [`rbac::RequireAdmin`] -- requires the `admin` role.
//! - [`rbac::RequireStaff`] -- requires `admin` or `employee`.

pub mod auth;
pub mod rbac;
