pub use super::accident_alert::{AlertStatus, ContactIds, Severity};
pub use super::emergency_contact::Relationship;
pub use super::{AccidentAlert, EmergencyContact};
