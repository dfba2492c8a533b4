//! Calendly scheduling links (single-use, owned by one event type).

use serde::Deserialize;
use tracing::info;

use super::ensure_success;
use crate::config::CalendlyConfig;
use crate::error::{HeraldError, Result};
use crate::types::Platform;

pub struct CalendlyExecutor {
    client: reqwest::Client,
    api_key: String,
    event_uuid: String,
    api_base: String,
}

impl CalendlyExecutor {
    pub fn new(client: reqwest::Client, config: &CalendlyConfig) -> Result<Self> {
        let api_key = config
            .api_key
            .clone()
            .ok_or_else(|| HeraldError::Config("CALENDLY_API_KEY is not set".to_string()))?;
        let event_uuid = config
            .event_uuid
            .clone()
            .ok_or_else(|| HeraldError::Config("CALENDLY_EVENT_UUID is not set".to_string()))?;

        Ok(Self {
            client,
            api_key,
            event_uuid,
            api_base: config.api_base.trim_end_matches('/').to_string(),
        })
    }

    /// Create a booking link usable for exactly one event
    pub async fn create_scheduling_link(&self) -> Result<String> {
        info!("Creating Calendly scheduling link");

        let payload = serde_json::json!({
            "max_event_count": 1,
            "owner": format!("{}/event_types/{}", self.api_base, self.event_uuid),
            "owner_type": "EventType"
        });

        let response = self
            .client
            .post(format!("{}/scheduling_links", self.api_base))
            .bearer_auth(&self.api_key)
            .json(&payload)
            .send()
            .await?;

        let response = ensure_success(Platform::Calendly, response).await?;
        let status = response.status();
        let body = response.text().await.unwrap_or_default();

        let link: SchedulingLinkResponse =
            serde_json::from_str(&body).map_err(|_| HeraldError::VendorPostFailed {
                platform: Platform::Calendly,
                status: Some(status.as_u16()),
                body: body.clone(),
            })?;

        info!("Calendly link created: {}", link.resource.booking_url);
        Ok(link.resource.booking_url)
    }
}

#[derive(Deserialize)]
struct SchedulingLinkResponse {
    resource: SchedulingLink,
}

#[derive(Deserialize)]
struct SchedulingLink {
    booking_url: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn executor(server: &MockServer) -> CalendlyExecutor {
        let config = CalendlyConfig {
            api_key: Some("cal-key".to_string()),
            event_uuid: Some("EVT-1".to_string()),
            api_base: server.uri(),
        };
        CalendlyExecutor::new(reqwest::Client::new(), &config).unwrap()
    }

    #[tokio::test]
    async fn test_create_scheduling_link() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/scheduling_links"))
            .and(header("Authorization", "Bearer cal-key"))
            .and(body_json(serde_json::json!({
                "max_event_count": 1,
                "owner": format!("{}/event_types/EVT-1", server.uri()),
                "owner_type": "EventType"
            })))
            .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({
                "resource": {
                    "booking_url": "https://calendly.com/d/abc-123",
                    "owner": "https://api.calendly.com/event_types/EVT-1",
                    "owner_type": "EventType"
                }
            })))
            .mount(&server)
            .await;

        let link = executor(&server).create_scheduling_link().await.unwrap();
        assert_eq!(link, "https://calendly.com/d/abc-123");
    }

    #[tokio::test]
    async fn test_rejected_request() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/scheduling_links"))
            .respond_with(ResponseTemplate::new(401).set_body_string("Unauthenticated"))
            .mount(&server)
            .await;

        assert!(matches!(
            executor(&server).create_scheduling_link().await,
            Err(HeraldError::VendorPostFailed {
                platform: Platform::Calendly,
                status: Some(401),
                ..
            })
        ));
    }

    #[test]
    fn test_missing_configuration() {
        assert!(matches!(
            CalendlyExecutor::new(reqwest::Client::new(), &CalendlyConfig::default()),
            Err(HeraldError::Config(_))
        ));
    }
}
