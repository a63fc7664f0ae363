use std::net::SocketAddr;
use std::time::Duration;

use clap::Parser;

use crate::error::BridgeError;
use crate::request::DEFAULT_MODEL_NAME;

#[derive(Parser, Debug)]
#[command(
    name = "serving-bridge",
    about = "HTTP bridge forwarding /model_prediction calls to TensorFlow Serving over gRPC",
    long_about = "HTTP bridge forwarding /model_prediction calls to TensorFlow Serving over gRPC.\n\n\
With no flags the bridge listens on 0.0.0.0:5000 and calls model \"default\" at \
localhost:9000 with a 10 second timeout, the fixed settings of the service it \
replaces. The flags and their SERVING_BRIDGE_* environment variables are an \
operator-facing addition that service did not have."
)]
pub struct CliArgs {
    /// Interface the HTTP listener binds to
    #[arg(long, default_value = "0.0.0.0", env = "SERVING_BRIDGE_LISTEN_HOST")]
    pub listen_host: String,

    /// HTTP listener port
    #[arg(long, default_value = "5000", env = "SERVING_BRIDGE_LISTEN_PORT")]
    pub listen_port: u16,

    /// Host of the TensorFlow Serving gRPC endpoint
    #[arg(long, default_value = "localhost", env = "SERVING_BRIDGE_SERVING_HOST")]
    pub serving_host: String,

    /// Port of the TensorFlow Serving gRPC endpoint
    #[arg(long, default_value = "9000", env = "SERVING_BRIDGE_SERVING_PORT")]
    pub serving_port: u16,

    /// Model name sent in every request's model_spec.
    /// Callers cannot override it.
    #[arg(long, default_value = DEFAULT_MODEL_NAME, env = "SERVING_BRIDGE_MODEL_NAME")]
    pub model_name: String,

    /// Predict call timeout in seconds
    #[arg(long, default_value = "10", env = "SERVING_BRIDGE_TIMEOUT")]
    pub timeout: u64,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info", env = "SERVING_BRIDGE_LOG_LEVEL")]
    pub log_level: String,
}

/// Resolved runtime configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct BridgeConfig {
    pub listen_host: String,
    pub listen_port: u16,
    pub serving_host: String,
    pub serving_port: u16,
    pub model_name: String,
    pub timeout: Duration,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            listen_host: "0.0.0.0".to_string(),
            listen_port: 5000,
            serving_host: "localhost".to_string(),
            serving_port: 9000,
            model_name: DEFAULT_MODEL_NAME.to_string(),
            timeout: Duration::from_secs(10),
        }
    }
}

impl BridgeConfig {
    /// URI of the gRPC endpoint, e.g. `http://localhost:9000`.
    pub fn serving_endpoint(&self) -> String {
        format!("http://{}:{}", self.serving_host, self.serving_port)
    }

    pub fn listen_addr(&self) -> Result<SocketAddr, BridgeError> {
        format!("{}:{}", self.listen_host, self.listen_port)
            .parse()
            .map_err(|e| {
                BridgeError::Config(format!(
                    "invalid listen address {}:{}: {e}",
                    self.listen_host, self.listen_port
                ))
            })
    }

    pub fn validate(&self) -> Result<(), BridgeError> {
        if self.model_name.is_empty() {
            return Err(BridgeError::Config("model name must not be empty".into()));
        }
        if self.timeout.is_zero() {
            return Err(BridgeError::Config("timeout must be at least one second".into()));
        }
        self.listen_addr().map(|_| ())
    }
}

impl From<&CliArgs> for BridgeConfig {
    fn from(args: &CliArgs) -> Self {
        Self {
            listen_host: args.listen_host.clone(),
            listen_port: args.listen_port,
            serving_host: args.serving_host.clone(),
            serving_port: args.serving_port,
            model_name: args.model_name.clone(),
            timeout: Duration::from_secs(args.timeout),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_reference_behavior() {
        let args = CliArgs::parse_from(["serving-bridge"]);
        let config = BridgeConfig::from(&args);
        assert_eq!(config, BridgeConfig::default());
        assert_eq!(config.serving_endpoint(), "http://localhost:9000");
        assert_eq!(config.listen_addr().unwrap().to_string(), "0.0.0.0:5000");
        assert_eq!(args.log_level, "info");
    }

    #[test]
    fn help_marks_flags_as_an_addition() {
        use clap::CommandFactory;

        let command = CliArgs::command();
        let long_about = command.get_long_about().unwrap().to_string();
        assert!(long_about.contains("SERVING_BRIDGE_*"));
        assert!(long_about.contains("operator-facing addition"));
        assert!(long_about.contains("localhost:9000"));
    }

    #[test]
    fn flags_override_defaults() {
        let args = CliArgs::parse_from([
            "serving-bridge",
            "--serving-host",
            "tfs.internal",
            "--serving-port",
            "8500",
            "--model-name",
            "mnist",
            "--timeout",
            "3",
        ]);
        let config = BridgeConfig::from(&args);
        assert_eq!(config.serving_endpoint(), "http://tfs.internal:8500");
        assert_eq!(config.model_name, "mnist");
        assert_eq!(config.timeout, Duration::from_secs(3));
    }

    #[test]
    fn validate_rejects_bad_values() {
        let mut config = BridgeConfig::default();
        assert!(config.validate().is_ok());

        config.timeout = Duration::ZERO;
        assert_eq!(config.validate().unwrap_err().code(), "CONFIG_ERROR");

        let config = BridgeConfig {
            listen_host: "not an ip".into(),
            ..BridgeConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
