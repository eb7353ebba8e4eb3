pub mod appointments;
pub mod booking;
pub mod calendar;
pub mod matcher;
