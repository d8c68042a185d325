//! Well-known role name constants.
//!
//! These must match the seed data in `20260101000002_create_accounts.sql`.

pub const ROLE_ADMIN: &str = "admin";
pub const ROLE_EMPLOYEE: &str = "employee";
pub const ROLE_MEMBER: &str = "member";

/// Club staff can operate on any membership, not only their own.
pub fn is_staff(role: &str) -> bool {
    role == ROLE_ADMIN || role == ROLE_EMPLOYEE
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admin_and_employee_are_staff() {
        assert!(is_staff(ROLE_ADMIN));
        assert!(is_staff(ROLE_EMPLOYEE));
        assert!(!is_staff(ROLE_MEMBER));
        assert!(!is_staff("guest"));
    }
}
