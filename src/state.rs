use std::sync::{Arc, Mutex};

use rusqlite::Connection;

use crate::config::AppConfig;
use crate::services::calendar::CalendarProvider;
use crate::services::matcher::DentalMatcher;

pub struct AppState {
    pub db: Arc<Mutex<Connection>>,
    pub config: AppConfig,
    pub matcher: DentalMatcher,
    pub calendar: Box<dyn CalendarProvider>,
}
