//! Domain model structs and DTOs.
//!
//! Each submodule contains:
//! - A `FromRow` + `Serialize` entity struct matching the database row
//! - A `Deserialize` create DTO for inserts
//! - A `Deserialize` update DTO (all `Option` fields) for patches

pub mod account;
pub mod application;
pub mod bill;
pub mod change_request;
pub mod club_config;
pub mod event;
pub mod membership;
pub mod membership_type;
pub mod reservation;
pub mod role;
pub mod session;
pub mod space;
pub mod stored_file;
pub mod user;
