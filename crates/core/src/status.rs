//! Status helper enums mapping to SMALLINT lookup tables.
//!
//! Each enum variant's discriminant matches the seed data order (1-based)
//! in the corresponding `*_statuses` database table, and `name()` matches
//! the seeded `name` column.

/// Status ID type matching SMALLINT in the database.
pub type StatusId = i16;

macro_rules! define_status_enum {
    (
        $(#[$meta:meta])*
        $name:ident {
            $( $(#[$vmeta:meta])* $variant:ident = $val:literal => $label:literal ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[repr(i16)]
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum $name {
            $( $(#[$vmeta])* $variant = $val ),+
        }

        impl $name {
            /// Return the database status ID.
            pub fn id(self) -> StatusId {
                self as StatusId
            }

            /// Resolve a database status ID, `None` for unknown ids.
            pub fn from_id(id: StatusId) -> Option<Self> {
                match id {
                    $( $val => Some(Self::$variant), )+
                    _ => None,
                }
            }

            /// Upper-case name as seeded in the lookup table.
            pub fn name(self) -> &'static str {
                match self {
                    $( Self::$variant => $label, )+
                }
            }
        }

        impl From<$name> for StatusId {
            fn from(value: $name) -> Self {
                value as StatusId
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.name())
            }
        }
    };
}

define_status_enum! {
    /// Membership lifecycle state.
    MembershipState {
        Active = 1 => "ACTIVE",
        Suspended = 2 => "SUSPENDED",
        Disaffiliated = 3 => "DISAFFILIATED",
    }
}

define_status_enum! {
    /// Review state shared by membership applications and change requests.
    RequestStatus {
        Pending = 1 => "PENDING",
        Rejected = 2 => "REJECTED",
        Approved = 3 => "APPROVED",
    }
}

define_status_enum! {
    /// Bill payment status.
    BillStatus {
        Pending = 1 => "PENDING",
        Paid = 2 => "PAID",
        Overdue = 3 => "OVERDUE",
        Cancelled = 4 => "CANCELLED",
    }
}

define_status_enum! {
    /// Space reservation status.
    ReservationStatus {
        Confirmed = 1 => "CONFIRMED",
        Cancelled = 2 => "CANCELLED",
    }
}

define_status_enum! {
    /// Club event status.
    EventStatus {
        Scheduled = 1 => "SCHEDULED",
        Cancelled = 2 => "CANCELLED",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bill_status_ids_match_seed_data() {
        assert_eq!(BillStatus::Pending.id(), 1);
        assert_eq!(BillStatus::Paid.id(), 2);
        assert_eq!(BillStatus::Overdue.id(), 3);
        assert_eq!(BillStatus::Cancelled.id(), 4);
    }

    #[test]
    fn request_status_ids_match_seed_data() {
        assert_eq!(RequestStatus::Pending.id(), 1);
        assert_eq!(RequestStatus::Rejected.id(), 2);
        assert_eq!(RequestStatus::Approved.id(), 3);
    }

    #[test]
    fn from_id_resolves_known_ids_only() {
        assert_eq!(MembershipState::from_id(2), Some(MembershipState::Suspended));
        assert_eq!(MembershipState::from_id(0), None);
        assert_eq!(MembershipState::from_id(4), None);
    }

    #[test]
    fn status_into_status_id() {
        let id: StatusId = ReservationStatus::Cancelled.into();
        assert_eq!(id, 2);
    }

    #[test]
    fn names_are_upper_case() {
        assert_eq!(BillStatus::Overdue.name(), "OVERDUE");
        assert_eq!(EventStatus::Scheduled.to_string(), "SCHEDULED");
    }
}
