use super::AdminChannel;
use super::command::{AdminCommand, CommandReply, WireReply};
use crate::config::ChannelConfig;
use crate::core::{Result, ZoneError};
use async_trait::async_trait;
use tracing::debug;

pub const COMMAND_PATH: &str = "/admin/command";

/// Admin channel speaking JSON over HTTP to an admin endpoint.
///
/// The request timeout from [`ChannelConfig`] is the only timeout applied to a
/// command; connection and timeout errors surface as `ZoneError::Unavailable`.
#[derive(Clone)]
pub struct HttpAdminChannel {
    client: reqwest::Client,
    command_url: String,
}

impl HttpAdminChannel {
    pub fn new(config: &ChannelConfig) -> Result<Self> {
        let endpoint = config.endpoint.trim_end_matches('/');
        if !(endpoint.starts_with("http://") || endpoint.starts_with("https://")) {
            return Err(ZoneError::InvalidConfig(format!(
                "endpoint '{}' must start with http:// or https://",
                config.endpoint
            )));
        }
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .connect_timeout(config.connect_timeout)
            .build()
            .map_err(|e| ZoneError::InvalidConfig(format!("cannot build HTTP client: {}", e)))?;
        Ok(Self {
            client,
            command_url: format!("{}{}", endpoint, COMMAND_PATH),
        })
    }

    pub fn command_url(&self) -> &str {
        &self.command_url
    }
}

#[async_trait]
impl AdminChannel for HttpAdminChannel {
    async fn run_command(&self, command: AdminCommand) -> Result<CommandReply> {
        let name = command.name();
        debug!(command = name, url = %self.command_url, "sending admin command");

        let response = self
            .client
            .post(&self.command_url)
            .json(&command)
            .send()
            .await
            .map_err(|e| {
                ZoneError::Unavailable(format!("{} could not be delivered: {}", name, e))
            })?;

        let status = response.status();
        if status.is_server_error() {
            return Err(ZoneError::Unavailable(format!(
                "admin endpoint answered {} to {}",
                status, name
            )));
        }

        let wire: WireReply = response.json().await.map_err(|e| ZoneError::MalformedReply {
            command: name.to_string(),
            reason: format!("status {}: {}", status, e),
        })?;
        Ok(wire.into())
    }
}
