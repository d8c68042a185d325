//! Domain rules for the club-membership backend.
//!
//! Everything in this crate is pure: no database access, no HTTP. The `db`
//! and `api` crates call into these modules to decide whether an operation
//! is legal and to compute monetary amounts.

pub mod billing;
pub mod error;
pub mod membership;
pub mod pagination;
pub mod recommendation;
pub mod reservation;
pub mod roles;
pub mod status;
pub mod types;
pub mod validation;
