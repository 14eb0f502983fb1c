use base64::Engine;
use failsafe::futures::CircuitBreaker as FuturesCircuitBreaker;
use failsafe::{backoff, failure_policy, Config, Error as FailsafeError, StateMachine};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("HTTP request failed: {0}")]
    RequestError(#[from] reqwest::Error),
    #[error("Source not found: {0}")]
    SourceNotFound(String),
    #[error("Gateway rejected request: {0}")]
    Rejected(String),
    #[error("Invalid response from gateway: {0}")]
    InvalidResponse(String),
    #[error("Circuit breaker open: {0}")]
    CircuitBreakerOpen(String),
}

/// Status of an e-wallet checkout source as reported by the gateway.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceStatus {
    pub id: String,
    pub status: String,
    pub checkout_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentResult {
    pub id: String,
    pub status: String,
}

#[derive(Debug, Deserialize)]
struct ApiEnvelope {
    data: ApiResource,
}

#[derive(Debug, Deserialize)]
struct ApiResource {
    id: String,
    attributes: ApiAttributes,
}

#[derive(Debug, Deserialize)]
struct ApiAttributes {
    status: String,
    redirect: Option<ApiRedirect>,
}

#[derive(Debug, Deserialize)]
struct ApiRedirect {
    checkout_url: Option<String>,
}

/// HTTP client for the e-wallet payment gateway (PayMongo-style API).
#[derive(Clone)]
pub struct GatewayClient {
    client: Client,
    base_url: String,
    auth_header: String,
    circuit_breaker: StateMachine<failure_policy::ConsecutiveFailures<backoff::EqualJittered>, ()>,
}

impl GatewayClient {
    pub fn new(base_url: String, secret_key: &str) -> Self {
        Self::with_circuit_breaker(base_url, secret_key, 3, 60)
    }

    pub fn with_circuit_breaker(
        base_url: String,
        secret_key: &str,
        failure_threshold: u32,
        reset_timeout_secs: u64,
    ) -> Self {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .unwrap_or_default();

        let backoff = backoff::equal_jittered(
            Duration::from_secs(reset_timeout_secs),
            Duration::from_secs(reset_timeout_secs * 2),
        );
        let policy = failure_policy::consecutive_failures(failure_threshold, backoff);
        let circuit_breaker = Config::new().failure_policy(policy).build();

        // Gateway uses HTTP Basic with the secret key as username, empty password.
        let token = base64::engine::general_purpose::STANDARD.encode(format!("{}:", secret_key));

        GatewayClient {
            client,
            base_url,
            auth_header: format!("Basic {}", token),
            circuit_breaker,
        }
    }

    pub fn circuit_state(&self) -> String {
        if self.circuit_breaker.is_call_permitted() {
            "closed".to_string()
        } else {
            "open".to_string()
        }
    }

    /// Opens a hosted checkout session for an e-wallet top-up and returns the
    /// source id plus the redirect URL the customer must visit.
    pub async fn create_source(
        &self,
        amount: i64,
        ewallet_type: &str,
        description: &str,
        success_url: &str,
        failed_url: &str,
    ) -> Result<SourceStatus, GatewayError> {
        let url = format!("{}/sources", self.base_url.trim_end_matches('/'));
        let payload = json!({
            "data": {
                "attributes": {
                    "amount": amount,
                    "type": ewallet_type,
                    "currency": "PHP",
                    "description": description,
                    "redirect": {
                        "success": success_url,
                        "failed": failed_url,
                    }
                }
            }
        });

        let client = self.client.clone();
        let auth = self.auth_header.clone();

        let result = self
            .circuit_breaker
            .call(async move {
                let response = client
                    .post(&url)
                    .header("Authorization", auth)
                    .json(&payload)
                    .send()
                    .await?;

                if !response.status().is_success() {
                    let body = response.text().await.unwrap_or_default();
                    return Err(GatewayError::Rejected(body));
                }

                let envelope = response.json::<ApiEnvelope>().await?;
                Ok(SourceStatus {
                    id: envelope.data.id,
                    status: envelope.data.attributes.status,
                    checkout_url: envelope
                        .data
                        .attributes
                        .redirect
                        .and_then(|r| r.checkout_url),
                })
            })
            .await;

        Self::unwrap_breaker(result)
    }

    /// Fetches the current status of a checkout source.
    pub async fn get_source(&self, source_id: &str) -> Result<SourceStatus, GatewayError> {
        let url = format!(
            "{}/sources/{}",
            self.base_url.trim_end_matches('/'),
            source_id
        );
        let client = self.client.clone();
        let auth = self.auth_header.clone();
        let id = source_id.to_string();

        let result = self
            .circuit_breaker
            .call(async move {
                let response = client.get(&url).header("Authorization", auth).send().await?;

                if response.status() == 404 {
                    return Err(GatewayError::SourceNotFound(id));
                }
                if !response.status().is_success() {
                    let body = response.text().await.unwrap_or_default();
                    return Err(GatewayError::Rejected(body));
                }

                let envelope = response.json::<ApiEnvelope>().await?;
                Ok(SourceStatus {
                    id: envelope.data.id,
                    status: envelope.data.attributes.status,
                    checkout_url: envelope
                        .data
                        .attributes
                        .redirect
                        .and_then(|r| r.checkout_url),
                })
            })
            .await;

        Self::unwrap_breaker(result)
    }

    /// Captures a chargeable source into an actual payment.
    pub async fn create_payment(
        &self,
        source_id: &str,
        amount: i64,
        description: &str,
    ) -> Result<PaymentResult, GatewayError> {
        let url = format!("{}/payments", self.base_url.trim_end_matches('/'));
        let payload = json!({
            "data": {
                "attributes": {
                    "amount": amount,
                    "currency": "PHP",
                    "description": description,
                    "source": { "id": source_id, "type": "source" }
                }
            }
        });

        let client = self.client.clone();
        let auth = self.auth_header.clone();

        let result = self
            .circuit_breaker
            .call(async move {
                let response = client
                    .post(&url)
                    .header("Authorization", auth)
                    .json(&payload)
                    .send()
                    .await?;

                if !response.status().is_success() {
                    let body = response.text().await.unwrap_or_default();
                    return Err(GatewayError::Rejected(body));
                }

                let envelope = response.json::<ApiEnvelope>().await?;
                Ok(PaymentResult {
                    id: envelope.data.id,
                    status: envelope.data.attributes.status,
                })
            })
            .await;

        Self::unwrap_breaker(result)
    }

    fn unwrap_breaker<T>(result: Result<T, FailsafeError<GatewayError>>) -> Result<T, GatewayError> {
        match result {
            Ok(value) => Ok(value),
            Err(FailsafeError::Rejected) => Err(GatewayError::CircuitBreakerOpen(
                "payment gateway circuit breaker is open".to_string(),
            )),
            Err(FailsafeError::Inner(e)) => Err(e),
        }
    }
}
