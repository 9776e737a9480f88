//! InferenceClient - Spot Classifier Communication Adapter
//!
//! ## Responsibilities
//!
//! - Send frame inference requests to the hosted detection service
//! - Handle response parsing
//! - Connection management

use crate::aggregator::Detection;
use crate::error::{Error, Result};
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use std::time::Duration;

/// Anything that can turn a JPEG frame into spot detections.
///
/// The reconciliation loop depends on this seam rather than on the concrete
/// HTTP client so classifier behavior can be substituted in tests.
#[async_trait]
pub trait SpotClassifier: Send + Sync {
    async fn classify(&self, frame: &[u8]) -> Result<Vec<Detection>>;
}

/// Inference response envelope
#[derive(Debug, Clone, Deserialize)]
pub struct InferResponse {
    #[serde(default)]
    pub predictions: Vec<Detection>,
}

/// HTTP client for the hosted spot-detection model
pub struct InferenceClient {
    client: reqwest::Client,
    base_url: String,
    model_id: String,
    api_key: String,
}

impl InferenceClient {
    /// Create new inference client
    pub fn new(base_url: String, model_id: String, api_key: String) -> Self {
        Self::with_timeout(base_url, model_id, api_key, Duration::from_secs(30))
    }

    /// Create new inference client with custom timeout
    pub fn with_timeout(
        base_url: String,
        model_id: String,
        api_key: String,
        timeout: Duration,
    ) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            base_url,
            model_id,
            api_key,
        }
    }

    /// Check whether the inference endpoint is reachable
    pub async fn health_check(&self) -> Result<bool> {
        match self.client.get(&self.base_url).send().await {
            Ok(resp) => Ok(resp.status().is_success()),
            Err(_) => Ok(false),
        }
    }

    /// Run the detection model over one JPEG frame
    pub async fn infer(&self, frame: Vec<u8>) -> Result<InferResponse> {
        let url = format!("{}/{}", self.base_url, self.model_id);

        let form = Form::new().part(
            "file",
            Part::bytes(frame)
                .file_name("frame.jpg")
                .mime_str("image/jpeg")?,
        );

        let resp = self
            .client
            .post(&url)
            .query(&[("api_key", self.api_key.as_str())])
            .multipart(form)
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(Error::Upstream(format!(
                "inference request failed: {}",
                resp.status()
            )));
        }

        let parsed: InferResponse = resp.json().await?;
        Ok(parsed)
    }
}

#[async_trait]
impl SpotClassifier for InferenceClient {
    async fn classify(&self, frame: &[u8]) -> Result<Vec<Detection>> {
        let response = self.infer(frame.to_vec()).await?;
        Ok(response.predictions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_infer_response_parses_predictions() {
        let body = r#"{
            "predictions": [
                {"class": "free", "confidence": 0.91, "x": 10.0, "y": 20.0, "width": 30.0, "height": 40.0},
                {"class": "car", "confidence": 0.84}
            ],
            "time": 0.04
        }"#;

        let parsed: InferResponse = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.predictions.len(), 2);
        assert_eq!(parsed.predictions[0].class_label, "free");
        assert_eq!(parsed.predictions[1].width, 0.0);
    }

    #[test]
    fn test_infer_response_tolerates_missing_predictions() {
        let parsed: InferResponse = serde_json::from_str("{}").unwrap();
        assert!(parsed.predictions.is_empty());
    }
}
