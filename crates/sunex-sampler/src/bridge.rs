use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use sunex_schemas::CounterSample;

use crate::{Sampler, SamplerError};

/// Connection settings for the register bridge of one inverter.
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    /// Base URL of the bridge (e.g. `http://127.0.0.1:8093`).
    pub base_url: String,
    /// Register name exposed by the bridge (e.g. `total_wh_out`).
    pub register: String,
    /// Bus unit id of the inverter behind the bridge.
    pub unit_id: u8,
    /// Counter name stamped on the produced sample.
    pub counter_name: String,
    /// Unit of measure stamped on the produced sample.
    pub unit: String,
    /// Per-request timeout. Timeout policy lives here, not in the reconciler.
    pub timeout: Duration,
}

/// Wire shape of one bridge register read.
#[derive(Debug, Deserialize)]
struct RegisterReading {
    value: f64,
}

/// Reads the cumulative counter from a local HTTP/JSON register bridge with
/// one GET per run.
#[derive(Debug)]
pub struct HttpBridgeSampler {
    config: BridgeConfig,
    client: reqwest::Client,
}

impl HttpBridgeSampler {
    pub fn new(config: BridgeConfig) -> Result<Self, SamplerError> {
        if config.base_url.trim().is_empty() {
            return Err(SamplerError::Config("bridge base_url is empty".to_string()));
        }

        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| SamplerError::Config(format!("building http client: {e}")))?;

        Ok(Self { config, client })
    }

    fn register_url(&self) -> String {
        format!(
            "{}/registers/{}?unit={}",
            self.config.base_url.trim_end_matches('/'),
            self.config.register,
            self.config.unit_id
        )
    }
}

#[async_trait]
impl Sampler for HttpBridgeSampler {
    fn name(&self) -> &'static str {
        "http-bridge"
    }

    async fn sample(&self) -> Result<CounterSample, SamplerError> {
        let url = self.register_url();

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| SamplerError::Transport(format!("GET {url}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(SamplerError::Transport(format!(
                "GET {url}: bridge returned status {status}"
            )));
        }

        let reading: RegisterReading = response
            .json()
            .await
            .map_err(|e| SamplerError::Decode(format!("register payload: {e}")))?;

        Ok(CounterSample::new(
            self.config.counter_name.clone(),
            reading.value,
            self.config.unit.clone(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use httpmock::prelude::*;

    use super::*;

    fn config(base_url: String) -> BridgeConfig {
        BridgeConfig {
            base_url,
            register: "total_wh_out".to_string(),
            unit_id: 3,
            counter_name: "Sunny TriPower 8.0".to_string(),
            unit: "Wh".to_string(),
            timeout: Duration::from_secs(5),
        }
    }

    #[tokio::test]
    async fn reads_counter_from_bridge() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/registers/total_wh_out")
                    .query_param("unit", "3");
                then.status(200)
                    .json_body(serde_json::json!({ "value": 8_675_309.0 }));
            })
            .await;

        let sampler = HttpBridgeSampler::new(config(server.base_url())).unwrap();
        let sample = sampler.sample().await.unwrap();

        mock.assert_async().await;
        assert_eq!(sample.name, "Sunny TriPower 8.0");
        assert_eq!(sample.value, 8_675_309.0);
        assert_eq!(sample.unit, "Wh");
    }

    #[tokio::test]
    async fn non_success_status_is_transport_error() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/registers/total_wh_out");
                then.status(502);
            })
            .await;

        let sampler = HttpBridgeSampler::new(config(server.base_url())).unwrap();
        let err = sampler.sample().await.unwrap_err();
        assert!(matches!(err, SamplerError::Transport(_)), "got {err}");
    }

    #[tokio::test]
    async fn undecodable_payload_is_decode_error() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/registers/total_wh_out");
                then.status(200).body("not json");
            })
            .await;

        let sampler = HttpBridgeSampler::new(config(server.base_url())).unwrap();
        let err = sampler.sample().await.unwrap_err();
        assert!(matches!(err, SamplerError::Decode(_)), "got {err}");
    }

    #[test]
    fn empty_base_url_is_config_error() {
        let err = HttpBridgeSampler::new(config(String::new())).unwrap_err();
        assert!(matches!(err, SamplerError::Config(_)));
    }
}
