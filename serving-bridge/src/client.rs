//! Outbound side of the bridge: the `Predict` call to TensorFlow Serving.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use tonic::codec::ProstCodec;
use tonic::codegen::http::uri::PathAndQuery;
use tonic::transport::{Channel, Endpoint};

use crate::config::BridgeConfig;
use crate::error::BridgeError;
use crate::proto::{PredictRequest, PredictResponse, PREDICT_PATH};

// ── Trait ─────────────────────────────────────────────────────────────────

/// Something that answers prediction requests.
///
/// The HTTP layer only sees this trait, so tests can substitute a recording
/// double for the gRPC client.
#[async_trait]
pub trait Predictor: Send + Sync {
    async fn predict(&self, request: PredictRequest) -> Result<PredictResponse, BridgeError>;
}

// ── gRPC implementation ───────────────────────────────────────────────────

/// `PredictionService` client over a lazily connected tonic channel.
///
/// The channel is shared by all requests; cloning it is cheap and concurrent
/// calls are multiplexed over the same HTTP/2 connection.
#[derive(Clone)]
pub struct GrpcPredictor {
    channel: Channel,
    endpoint: String,
    timeout: Duration,
}

impl GrpcPredictor {
    /// Create a predictor for `endpoint` (e.g. `http://localhost:9000`).
    /// No connection is attempted until the first call.
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self, BridgeError> {
        let endpoint = endpoint.into();
        let channel = Endpoint::from_shared(endpoint.clone())
            .map_err(|e| BridgeError::Config(format!("invalid serving endpoint {endpoint}: {e}")))?
            .connect_timeout(timeout)
            .connect_lazy();
        Ok(Self {
            channel,
            endpoint,
            timeout,
        })
    }

    pub fn from_config(config: &BridgeConfig) -> Result<Self, BridgeError> {
        Self::new(config.serving_endpoint(), config.timeout)
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn unary(&self, request: PredictRequest) -> Result<PredictResponse, BridgeError> {
        let mut grpc = tonic::client::Grpc::new(self.channel.clone());
        grpc.ready()
            .await
            .map_err(|e| BridgeError::Transport(format!("service was not ready: {e}")))?;

        let mut request = tonic::Request::new(request);
        request.set_timeout(self.timeout);

        let codec = ProstCodec::<PredictRequest, PredictResponse>::default();
        let path = PathAndQuery::from_static(PREDICT_PATH);
        let response = grpc
            .unary(request, path, codec)
            .await
            .map_err(BridgeError::from_status)?;
        Ok(response.into_inner())
    }
}

#[async_trait]
impl Predictor for GrpcPredictor {
    async fn predict(&self, request: PredictRequest) -> Result<PredictResponse, BridgeError> {
        tracing::debug!(endpoint = %self.endpoint, "Sending Predict request");
        let started = Instant::now();
        match tokio::time::timeout(self.timeout, self.unary(request)).await {
            // The channel enforces the grpc-timeout header on its own and may
            // win the race against the outer timer.
            Ok(Err(e)) if started.elapsed() >= self.timeout => {
                tracing::debug!("Predict failed at deadline: {}", e);
                Err(BridgeError::Timeout(self.timeout))
            }
            Ok(result) => result,
            Err(_) => Err(BridgeError::Timeout(self.timeout)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_malformed_endpoint() {
        let err = GrpcPredictor::new("not a uri", Duration::from_secs(1)).err().unwrap();
        assert_eq!(err.code(), "CONFIG_ERROR");
    }

    #[tokio::test]
    async fn builds_lazily_from_config() {
        let predictor = GrpcPredictor::from_config(&BridgeConfig::default()).unwrap();
        assert_eq!(predictor.endpoint(), "http://localhost:9000");
    }
}
