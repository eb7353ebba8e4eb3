use anyhow::Context;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::models::Appointment;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalendarSlot {
    pub start: String,
    pub end: String,
}

/// Boundary to the external calendar service. The backend only proxies:
/// availability checks and event CRUD, no scheduling logic of its own.
#[async_trait]
pub trait CalendarProvider: Send + Sync {
    async fn check_availability(
        &self,
        practice_id: &str,
        date: &str,
    ) -> anyhow::Result<Vec<CalendarSlot>>;

    /// Creates a calendar event and returns the service's event id.
    async fn create_event(&self, appointment: &Appointment) -> anyhow::Result<String>;

    async fn update_event(&self, event_id: &str, appointment: &Appointment) -> anyhow::Result<()>;

    async fn cancel_event(&self, event_id: &str) -> anyhow::Result<()>;
}

pub struct HttpCalendarProvider {
    base_url: String,
    api_key: String,
    client: reqwest::Client,
}

impl HttpCalendarProvider {
    pub fn new(base_url: String, api_key: String) -> Self {
        Self {
            base_url,
            api_key,
            client: reqwest::Client::new(),
        }
    }
}

#[derive(Deserialize)]
struct CreateEventResponse {
    event_id: String,
}

#[derive(Deserialize)]
struct AvailabilityResponse {
    slots: Vec<CalendarSlot>,
}

#[async_trait]
impl CalendarProvider for HttpCalendarProvider {
    async fn check_availability(
        &self,
        practice_id: &str,
        date: &str,
    ) -> anyhow::Result<Vec<CalendarSlot>> {
        let url = format!("{}/v1/availability", self.base_url);
        let response: AvailabilityResponse = self
            .client
            .get(&url)
            .bearer_auth(&self.api_key)
            .query(&[("practice_id", practice_id), ("date", date)])
            .send()
            .await
            .context("failed to reach calendar service")?
            .error_for_status()
            .context("calendar availability check returned error")?
            .json()
            .await
            .context("invalid availability response")?;
        Ok(response.slots)
    }

    async fn create_event(&self, appointment: &Appointment) -> anyhow::Result<String> {
        let url = format!("{}/v1/events", self.base_url);
        let response: CreateEventResponse = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(appointment)
            .send()
            .await
            .context("failed to reach calendar service")?
            .error_for_status()
            .context("calendar event creation returned error")?
            .json()
            .await
            .context("invalid event creation response")?;
        Ok(response.event_id)
    }

    async fn update_event(&self, event_id: &str, appointment: &Appointment) -> anyhow::Result<()> {
        let url = format!("{}/v1/events/{event_id}", self.base_url);
        self.client
            .put(&url)
            .bearer_auth(&self.api_key)
            .json(appointment)
            .send()
            .await
            .context("failed to reach calendar service")?
            .error_for_status()
            .context("calendar event update returned error")?;
        Ok(())
    }

    async fn cancel_event(&self, event_id: &str) -> anyhow::Result<()> {
        let url = format!("{}/v1/events/{event_id}", self.base_url);
        self.client
            .delete(&url)
            .bearer_auth(&self.api_key)
            .send()
            .await
            .context("failed to reach calendar service")?
            .error_for_status()
            .context("calendar event cancellation returned error")?;
        Ok(())
    }
}
