//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async methods that
//! accept `&PgPool` as the first argument. Methods suffixed `_in_tx` take
//! an open transaction instead so callers can compose multi-table writes.

pub mod account_repo;
pub mod application_repo;
pub mod bill_repo;
pub mod change_request_repo;
pub mod club_config_repo;
pub mod event_repo;
pub mod file_repo;
pub mod inscription_repo;
pub mod membership_repo;
pub mod membership_type_repo;
pub mod reservation_repo;
pub mod role_repo;
pub mod session_repo;
pub mod space_repo;
pub mod user_repo;

pub use account_repo::AccountRepo;
pub use application_repo::ApplicationRepo;
pub use bill_repo::BillRepo;
pub use change_request_repo::ChangeRequestRepo;
pub use club_config_repo::ClubConfigRepo;
pub use event_repo::EventRepo;
pub use file_repo::FileRepo;
pub use inscription_repo::InscriptionRepo;
pub use membership_repo::MembershipRepo;
pub use membership_type_repo::MembershipTypeRepo;
pub use reservation_repo::ReservationRepo;
pub use role_repo::RoleRepo;
pub use session_repo::SessionRepo;
pub use space_repo::SpaceRepo;
pub use user_repo::UserRepo;
