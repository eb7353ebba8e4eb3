pub mod appointment;
pub mod call;
pub mod intent;
pub mod practice;
pub mod webhook;

pub use appointment::{Appointment, AppointmentStatus};
pub use call::{CallRecord, CallStatus};
pub use intent::{EntityType, Intent, IntentResult};
pub use practice::{PracticeConfig, PracticeLocation};
pub use webhook::CallEvent;
