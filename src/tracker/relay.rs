use reqwest::Client;
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};
use url::Url;

use super::event::SubmissionEvent;

#[derive(Debug, Error)]
pub enum RelayError {
    #[error("no relay endpoints configured")]
    NoEndpoints,
    #[error("failed to build HTTP client: {0}")]
    Client(reqwest::Error),
    /// Every endpoint failed at the network level; holds the last failure.
    #[error("network error posting to {endpoint}: {source}")]
    Network {
        endpoint: Url,
        #[source]
        source: reqwest::Error,
    },
    #[error("{endpoint} rejected the submission with status {status}: {message}")]
    Status {
        endpoint: Url,
        status: u16,
        message: String,
    },
}

/// A submission the backend accepted.
#[derive(Debug, Clone)]
pub struct Delivery {
    pub endpoint: Url,
    pub status: u16,
    pub body: Value,
}

/// Reply shape handed back to whoever asked for the relay.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RelayOutcome {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<&Result<Delivery, RelayError>> for RelayOutcome {
    fn from(result: &Result<Delivery, RelayError>) -> Self {
        match result {
            Ok(delivery) => Self {
                success: true,
                data: Some(delivery.body.clone()),
                error: None,
            },
            Err(e) => Self {
                success: false,
                data: None,
                error: Some(e.to_string()),
            },
        }
    }
}

/// Posts events to an ordered list of endpoints. Transport failures fall
/// through to the next endpoint; any HTTP response, good or bad, ends the attempt.
#[derive(Debug, Clone)]
pub struct Relay {
    client: Client,
    endpoints: Vec<Url>,
}

impl Relay {
    pub fn new(endpoints: Vec<Url>, timeout: Duration) -> Result<Self, RelayError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(RelayError::Client)?;
        Ok(Self { client, endpoints })
    }

    pub fn endpoints(&self) -> &[Url] {
        &self.endpoints
    }

    pub async fn send(&self, event: &SubmissionEvent) -> Result<Delivery, RelayError> {
        let mut last_failure = None;

        for endpoint in &self.endpoints {
            let response = match self.client.post(endpoint.clone()).json(event).send().await {
                Ok(response) => response,
                Err(e) => {
                    warn!("Relay to {} failed ({}), trying next endpoint", endpoint, e);
                    last_failure = Some((endpoint.clone(), e));
                    continue;
                }
            };

            let status = response.status();
            // A body we cannot read is still a response: the endpoint was reached.
            let text = response.text().await.unwrap_or_default();
            let body = serde_json::from_str::<Value>(&text).unwrap_or(Value::String(text));

            if !status.is_success() {
                let message = body
                    .get("error")
                    .and_then(Value::as_str)
                    .map(str::to_string)
                    .unwrap_or_else(|| match &body {
                        Value::String(s) if !s.is_empty() => s.clone(),
                        _ => status.canonical_reason().unwrap_or("error").to_string(),
                    });
                warn!("{} answered {} for {}", endpoint, status, event.slug);
                return Err(RelayError::Status {
                    endpoint: endpoint.clone(),
                    status: status.as_u16(),
                    message,
                });
            }

            info!(
                "Relayed {} ({}) to {} with status {}",
                event.slug, event.platform, endpoint, status
            );
            return Ok(Delivery {
                endpoint: endpoint.clone(),
                status: status.as_u16(),
                body,
            });
        }

        match last_failure {
            Some((endpoint, source)) => Err(RelayError::Network { endpoint, source }),
            None => Err(RelayError::NoEndpoints),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn empty_endpoint_list_is_an_error() {
        let relay = Relay::new(Vec::new(), Duration::from_secs(1)).unwrap();
        let event = SubmissionEvent {
            platform: crate::db::Platform::Leetcode,
            username: "anonymous".into(),
            email: "a@b.com".into(),
            url: "https://leetcode.com/problems/two-sum/".into(),
            slug: "two-sum".into(),
            verdict: "Accepted".into(),
            attempts: 1,
            timestamp: chrono::Utc::now(),
            problem_title: None,
            language: None,
            contest_id: None,
            submission_id: None,
        };
        let result = relay.send(&event).await;
        assert!(matches!(result, Err(RelayError::NoEndpoints)));

        let outcome = RelayOutcome::from(&result);
        assert!(!outcome.success);
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["success"], false);
        assert!(json.get("data").is_none());
        assert_eq!(json["error"], "no relay endpoints configured");
    }
}
