//! Stripe payment links through the hosted payment gateway.

use tracing::{debug, info};

use super::ensure_success;
use crate::config::PaymentConfig;
use crate::error::{HeraldError, Result};
use crate::types::Platform;

pub struct PaymentLinkExecutor {
    client: reqwest::Client,
    gateway_url: String,
    stripe_key: String,
}

impl PaymentLinkExecutor {
    pub fn new(client: reqwest::Client, config: &PaymentConfig) -> Result<Self> {
        let stripe_key = config
            .stripe_key
            .clone()
            .ok_or_else(|| HeraldError::Config("STRIPE_API_KEY is not set".to_string()))?;
        Ok(Self {
            client,
            gateway_url: config.gateway_url.clone(),
            stripe_key,
        })
    }

    /// Ask the gateway for a payment link; returns the gateway's response text
    pub async fn create_payment_link(&self, query: &str, price_id: &str) -> Result<String> {
        if price_id.trim().is_empty() {
            return Err(HeraldError::Validation("Price id cannot be empty".to_string()));
        }
        info!("Requesting payment link for price {}", price_id);

        let payload = serde_json::json!({
            "prompt": query,
            "price_id": price_id,
            "stripe_key": self.stripe_key,
        });

        let response = self
            .client
            .post(&self.gateway_url)
            .json(&payload)
            .send()
            .await?;

        let response = ensure_success(Platform::Payment, response).await?;
        let body = response.text().await.unwrap_or_default();
        debug!("Payment gateway returned {} bytes", body.len());
        Ok(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn executor(server: &MockServer) -> PaymentLinkExecutor {
        let config = PaymentConfig {
            gateway_url: format!("{}/payment", server.uri()),
            stripe_key: Some("sk_test".to_string()),
            ..PaymentConfig::default()
        };
        PaymentLinkExecutor::new(reqwest::Client::new(), &config).unwrap()
    }

    #[tokio::test]
    async fn test_create_payment_link() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/payment"))
            .and(body_json(serde_json::json!({
                "prompt": "I want the premium mattress",
                "price_id": "price_123",
                "stripe_key": "sk_test"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_string("https://buy.stripe.com/test_abc"))
            .mount(&server)
            .await;

        let link = executor(&server)
            .create_payment_link("I want the premium mattress", "price_123")
            .await
            .unwrap();
        assert_eq!(link, "https://buy.stripe.com/test_abc");
    }

    #[tokio::test]
    async fn test_gateway_failure() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/payment"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;

        assert!(matches!(
            executor(&server).create_payment_link("q", "price_123").await,
            Err(HeraldError::VendorPostFailed {
                platform: Platform::Payment,
                status: Some(500),
                ..
            })
        ));
    }
}
