use std::{
    net::{IpAddr, SocketAddr},
    time::Duration,
};

use clap::Parser;

#[derive(Debug, Clone, Parser)]
#[command(
    name = "approval-relay",
    version,
    about = "Relay bridging Slack interactive approval messages to CodePipeline approval gates"
)]
pub struct Args {
    #[arg(long, env = "RELAY_HOST", default_value = "127.0.0.1")]
    pub host: IpAddr,

    #[arg(long, env = "RELAY_PORT", default_value_t = 8080)]
    pub port: u16,

    /// Shared secret carried in every Slack interactive callback.
    #[arg(long, env = "SLACK_VERIFICATION_TOKEN")]
    pub slack_verification_token: Option<String>,

    /// CodePipeline endpoint (regional endpoint or signing proxy).
    #[arg(long, env = "RELAY_PIPELINE_API_URL")]
    pub pipeline_api_url: Option<String>,

    /// Bearer token forwarded to the pipeline endpoint, for signing-proxy setups.
    #[arg(long, env = "RELAY_PIPELINE_API_TOKEN")]
    pub pipeline_api_token: Option<String>,

    #[arg(long, env = "RELAY_PIPELINE_TIMEOUT_MS", default_value_t = 10_000)]
    pub pipeline_timeout_ms: u64,

    #[arg(long, env = "RUST_LOG", default_value = "info")]
    pub log_filter: String,

    #[arg(long, env = "RELAY_JSON_LOGS", default_value_t = false)]
    pub json_logs: bool,
}

#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub host: IpAddr,
    pub port: u16,
    pub verification_token: String,
    pub pipeline_api_url: String,
    pub pipeline_api_token: Option<String>,
    pub pipeline_timeout: Duration,
    pub log_filter: String,
    pub json_logs: bool,
}

impl RuntimeConfig {
    pub fn from_args(args: Args) -> Result<Self, String> {
        if args.port == 0 {
            return Err("port must be greater than 0".to_owned());
        }

        let verification_token = normalize_secret(args.slack_verification_token)
            .ok_or_else(|| "SLACK_VERIFICATION_TOKEN must be set and non-empty".to_owned())?;
        let pipeline_api_url = normalize_secret(args.pipeline_api_url)
            .ok_or_else(|| "RELAY_PIPELINE_API_URL must be set and non-empty".to_owned())?;
        if !pipeline_api_url.starts_with("http://") && !pipeline_api_url.starts_with("https://") {
            return Err("RELAY_PIPELINE_API_URL must be an http(s) URL".to_owned());
        }
        if args.pipeline_timeout_ms == 0 {
            return Err("pipeline_timeout_ms must be greater than 0".to_owned());
        }

        Ok(Self {
            host: args.host,
            port: args.port,
            verification_token,
            pipeline_api_url,
            pipeline_api_token: normalize_secret(args.pipeline_api_token),
            pipeline_timeout: Duration::from_millis(args.pipeline_timeout_ms),
            log_filter: args.log_filter,
            json_logs: args.json_logs,
        })
    }

    #[must_use]
    pub fn bind_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    #[must_use]
    pub fn for_test(host: IpAddr, port: u16, pipeline_api_url: String) -> Self {
        Self {
            host,
            port,
            verification_token: "test-secret".to_owned(),
            pipeline_api_url,
            pipeline_api_token: None,
            pipeline_timeout: Duration::from_millis(3_000),
            log_filter: "warn".to_owned(),
            json_logs: false,
        }
    }
}

fn normalize_secret(input: Option<String>) -> Option<String> {
    input.and_then(|value| {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_owned())
        }
    })
}
