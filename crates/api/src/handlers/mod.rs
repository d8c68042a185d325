//! HTTP handlers, one module per resource.

pub mod access;
pub mod accounts;
pub mod applications;
pub mod auth;
pub mod bills;
pub mod change_requests;
pub mod club_config;
pub mod events;
pub mod files;
pub mod membership_types;
pub mod memberships;
pub mod reservations;
pub mod spaces;
pub mod users;
