// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
// IHC Attribution API Adapter
//
// Anti-Corruption Layer for the IHC scoring endpoint.
// Translates batches into the `customer_journeys` wire body and the
// `value` rows of the response back into attribution weights.

use crate::domain::attribution::AttributionWeight;
use crate::domain::config::ApiConfig;
use crate::domain::journey::{Batch, JourneyRow};
use crate::domain::scoring::{AttributionScorer, ScoringError, ScoringResponse};
use crate::domain::touchpoint::{ConversionId, SessionId};
use async_trait::async_trait;
use serde::{Deserialize, Deserializer, Serialize};
use std::time::Duration;

pub struct IhcApiClient {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    conv_type_id: String,
}

#[derive(Serialize)]
struct IhcRequest<'a> {
    customer_journeys: &'a [JourneyRow],
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct IhcResponse {
    #[serde(default)]
    status_code: Option<i64>,
    #[serde(default)]
    partial_failure_errors: Option<Vec<serde_json::Value>>,
    #[serde(default)]
    value: Option<Vec<IhcValue>>,
}

#[derive(Deserialize)]
struct IhcValue {
    #[serde(deserialize_with = "lenient_id")]
    conversion_id: String,
    #[serde(deserialize_with = "lenient_id")]
    session_id: String,
    ihc: f64,
}

/// Ids come back as strings or bare numbers depending on the source column.
fn lenient_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(s) => Ok(s),
        serde_json::Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected string or number id, got {}",
            other
        ))),
    }
}

impl IhcApiClient {
    pub fn new(
        endpoint: String,
        api_key: String,
        conv_type_id: String,
        timeout: Duration,
    ) -> Result<Self, ScoringError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ScoringError::Network(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            endpoint,
            api_key,
            conv_type_id,
        })
    }

    /// Build from configuration. Fails before any request when credentials are missing.
    pub fn from_config(config: &ApiConfig) -> anyhow::Result<Self> {
        config.validate_credentials()?;
        let api_key = config.resolve_api_key()?;
        Ok(Self::new(
            config.endpoint.clone(),
            api_key,
            config.conv_type_id.clone(),
            config.request_timeout,
        )?)
    }
}

#[async_trait]
impl AttributionScorer for IhcApiClient {
    async fn score(&self, batch: &Batch) -> Result<ScoringResponse, ScoringError> {
        let rows = batch.to_rows();
        let request = IhcRequest {
            customer_journeys: &rows,
        };

        let response = self
            .client
            .post(&self.endpoint)
            .query(&[("conv_type_id", self.conv_type_id.as_str())])
            .header("x-api-key", &self.api_key)
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ScoringError::Timeout(e.to_string())
                } else {
                    ScoringError::Network(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();

            return Err(if status == 401 || status == 403 {
                ScoringError::Authentication(error_text)
            } else if status == 429 {
                ScoringError::RateLimited
            } else {
                ScoringError::Status {
                    status: status.as_u16(),
                    body: error_text,
                }
            });
        }

        let body = response.text().await.map_err(|e| {
            if e.is_timeout() {
                ScoringError::Timeout(e.to_string())
            } else {
                ScoringError::Network(e.to_string())
            }
        })?;

        let ihc_response: IhcResponse = serde_json::from_str(&body)
            .map_err(|e| ScoringError::MalformedResponse(format!("Failed to parse response: {}", e)))?;

        let weights = ihc_response
            .value
            .unwrap_or_default()
            .into_iter()
            .map(|v| {
                AttributionWeight::new(
                    ConversionId(v.conversion_id),
                    SessionId(v.session_id),
                    v.ihc,
                )
            })
            .collect();

        Ok(ScoringResponse {
            status_code: ihc_response.status_code,
            weights,
            partial_failures: ihc_response.partial_failure_errors.unwrap_or_default(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::journey::{Journey, JourneyTouchpoint};
    use chrono::NaiveDate;
    use mockito::Matcher;

    fn batch() -> Batch {
        let occurred_at = NaiveDate::from_ymd_opt(2024, 1, 10)
            .unwrap()
            .and_hms_opt(9, 30, 0)
            .unwrap();
        Batch::new(vec![Journey::new(
            "c1".into(),
            vec![JourneyTouchpoint {
                session_id: "s1".into(),
                occurred_at,
                channel_label: "SEA".to_string(),
                holder_engagement: true,
                closer_engagement: false,
                impression_interaction: false,
                is_conversion_event: false,
            }],
        )])
    }

    fn client(server: &mockito::ServerGuard) -> IhcApiClient {
        IhcApiClient::new(
            format!("{}/v1/compute_ihc", server.url()),
            "secret".to_string(),
            "purchase".to_string(),
            Duration::from_secs(5),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_score_sends_journeys_and_parses_weights() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/v1/compute_ihc")
            .match_query(Matcher::UrlEncoded("conv_type_id".into(), "purchase".into()))
            .match_header("x-api-key", "secret")
            .match_body(Matcher::PartialJson(serde_json::json!({
                "customer_journeys": [{
                    "conversion_id": "c1",
                    "session_id": "s1",
                    "timestamp": "2024-01-10 09:30:00",
                    "channel_label": "SEA",
                    "holder_engagement": 1,
                    "closer_engagement": 0,
                    "conversion": 0,
                    "impression_interaction": 0
                }]
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"statusCode": 200, "value": [{"conversion_id": "c1", "session_id": 42, "ihc": 1.0}]}"#,
            )
            .create_async()
            .await;

        let response = client(&server).score(&batch()).await.unwrap();

        mock.assert_async().await;
        assert_eq!(response.status_code, Some(200));
        assert_eq!(response.weights, vec![AttributionWeight::new("c1".into(), "42".into(), 1.0)]);
        assert!(!response.has_partial_failures());
    }

    #[tokio::test]
    async fn test_missing_value_is_empty_result() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/v1/compute_ihc")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(r#"{"statusCode": 206, "partialFailureErrors": [{"conversion_id": "c1"}]}"#)
            .create_async()
            .await;

        let response = client(&server).score(&batch()).await.unwrap();

        assert!(response.weights.is_empty());
        assert!(response.has_partial_failures());
    }

    #[tokio::test]
    async fn test_status_codes_map_to_errors() {
        let mut server = mockito::Server::new_async().await;
        let scorer = client(&server);

        let cases = [(401, "auth"), (429, "rate"), (500, "status")];
        for (status, kind) in cases {
            let mock = server
                .mock("POST", "/v1/compute_ihc")
                .match_query(Matcher::Any)
                .with_status(status)
                .with_body("nope")
                .create_async()
                .await;

            let err = scorer.score(&batch()).await.unwrap_err();
            match (kind, err) {
                ("auth", ScoringError::Authentication(body)) => assert_eq!(body, "nope"),
                ("rate", ScoringError::RateLimited) => {}
                ("status", ScoringError::Status { status, body }) => {
                    assert_eq!(status, 500);
                    assert_eq!(body, "nope");
                }
                (kind, other) => panic!("{}: unexpected error {:?}", kind, other),
            }
            mock.remove_async().await;
        }
    }

    #[tokio::test]
    async fn test_malformed_body() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/v1/compute_ihc")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body("<html>gateway</html>")
            .create_async()
            .await;

        let err = client(&server).score(&batch()).await.unwrap_err();
        assert!(matches!(err, ScoringError::MalformedResponse(_)));
    }

    #[test]
    fn test_from_config_requires_credentials() {
        let config = ApiConfig::default();
        assert!(IhcApiClient::from_config(&config).is_err());

        let config = ApiConfig {
            api_key: Some("key".to_string()),
            conv_type_id: "purchase".to_string(),
            ..ApiConfig::default()
        };
        let client = IhcApiClient::from_config(&config).unwrap();
        assert_eq!(client.endpoint, config.endpoint);
    }
}
