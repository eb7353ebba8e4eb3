use std::env;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub port: u16,
    pub database_url: String,
    pub admin_token: String,
    pub voice_secret: String,
    pub calendar_api_url: String,
    pub calendar_api_key: String,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self {
            port: env::var("PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(3000),
            database_url: env::var("DATABASE_URL").unwrap_or_else(|_| "chairside.db".to_string()),
            admin_token: env::var("ADMIN_TOKEN").unwrap_or_else(|_| "changeme".to_string()),
            voice_secret: env::var("VOICE_WEBHOOK_SECRET").unwrap_or_default(),
            calendar_api_url: env::var("CALENDAR_API_URL")
                .unwrap_or_else(|_| "http://localhost:8080".to_string()),
            calendar_api_key: env::var("CALENDAR_API_KEY").unwrap_or_default(),
        }
    }
}
