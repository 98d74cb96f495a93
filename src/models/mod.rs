pub mod enums;
pub mod incident;

pub use enums::{IncidentStatus, Severity};
pub use incident::{Entity as Incident, Model as IncidentModel};
