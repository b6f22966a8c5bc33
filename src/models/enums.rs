use crate::db::DatabaseError;
use serde::{Deserialize, Serialize};

/// Macro to generate enum with as_str + std::str::FromStr pattern
macro_rules! str_enum {
    ($name:ident { $($variant:ident => $s:literal),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
        #[serde(rename_all = "snake_case")]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $s),+
                }
            }
        }

        impl std::str::FromStr for $name {
            type Err = DatabaseError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($s => Ok(Self::$variant)),+,
                    _ => Err(DatabaseError::InvalidEnum {
                        field: stringify!($name).into(),
                        value: s.into(),
                    }),
                }
            }
        }
    };
}

str_enum!(Role {
    Patient => "patient",
    Doctor => "doctor",
    Admin => "admin",
});

str_enum!(AppointmentStatus {
    Pending => "pending",
    Confirmed => "confirmed",
    Completed => "completed",
    Cancelled => "cancelled",
});

str_enum!(NotificationType {
    AppointmentCreated => "appointment_created",
    AppointmentConfirmed => "appointment_confirmed",
    AppointmentCancelled => "appointment_cancelled",
    AppointmentReminder => "appointment_reminder",
    General => "general",
});

str_enum!(Weekday {
    Monday => "monday",
    Tuesday => "tuesday",
    Wednesday => "wednesday",
    Thursday => "thursday",
    Friday => "friday",
    Saturday => "saturday",
    Sunday => "sunday",
});

impl AppointmentStatus {
    /// Legal status transitions. Completed and cancelled are terminal;
    /// a cancelled appointment is never resurrected.
    pub fn can_transition_to(self, next: AppointmentStatus) -> bool {
        use AppointmentStatus::*;
        matches!(
            (self, next),
            (Pending, Confirmed) | (Pending, Cancelled) | (Confirmed, Completed) | (Confirmed, Cancelled)
        )
    }

    /// Patients may only reschedule appointments that are still open.
    pub fn is_reschedulable(self) -> bool {
        matches!(self, AppointmentStatus::Pending | AppointmentStatus::Confirmed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn role_round_trip() {
        for (variant, s) in [
            (Role::Patient, "patient"),
            (Role::Doctor, "doctor"),
            (Role::Admin, "admin"),
        ] {
            assert_eq!(variant.as_str(), s);
            assert_eq!(Role::from_str(s).unwrap(), variant);
        }
    }

    #[test]
    fn appointment_status_round_trip() {
        for (variant, s) in [
            (AppointmentStatus::Pending, "pending"),
            (AppointmentStatus::Confirmed, "confirmed"),
            (AppointmentStatus::Completed, "completed"),
            (AppointmentStatus::Cancelled, "cancelled"),
        ] {
            assert_eq!(variant.as_str(), s);
            assert_eq!(AppointmentStatus::from_str(s).unwrap(), variant);
        }
    }

    #[test]
    fn invalid_enum_returns_error() {
        assert!(Role::from_str("nurse").is_err());
        assert!(AppointmentStatus::from_str("rescheduled").is_err());
        assert!(NotificationType::from_str("").is_err());
    }

    #[test]
    fn legal_transitions() {
        use AppointmentStatus::*;
        assert!(Pending.can_transition_to(Confirmed));
        assert!(Pending.can_transition_to(Cancelled));
        assert!(Confirmed.can_transition_to(Completed));
        assert!(Confirmed.can_transition_to(Cancelled));
    }

    #[test]
    fn cancelled_is_terminal() {
        use AppointmentStatus::*;
        for next in [Pending, Confirmed, Completed, Cancelled] {
            assert!(!Cancelled.can_transition_to(next));
        }
    }

    #[test]
    fn completed_is_terminal() {
        use AppointmentStatus::*;
        for next in [Pending, Confirmed, Completed, Cancelled] {
            assert!(!Completed.can_transition_to(next));
        }
    }

    #[test]
    fn pending_cannot_skip_to_completed() {
        assert!(!AppointmentStatus::Pending.can_transition_to(AppointmentStatus::Completed));
    }

    #[test]
    fn reschedulable_states() {
        assert!(AppointmentStatus::Pending.is_reschedulable());
        assert!(AppointmentStatus::Confirmed.is_reschedulable());
        assert!(!AppointmentStatus::Completed.is_reschedulable());
        assert!(!AppointmentStatus::Cancelled.is_reschedulable());
    }
}
