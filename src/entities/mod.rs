pub mod accident_alert;
pub mod emergency_contact;

pub use accident_alert::Entity as AccidentAlert;
pub use emergency_contact::Entity as EmergencyContact;

pub mod prelude;
