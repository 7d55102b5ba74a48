use navrec_common::protocol::Result;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::channel::RpcChannel;

/// What to do with the robot's motor power.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PowerRequest {
    Cycle,
    On,
    Off,
}

impl std::str::FromStr for PowerRequest {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "cycle" => Ok(PowerRequest::Cycle),
            "on" => Ok(PowerRequest::On),
            "off" => Ok(PowerRequest::Off),
            other => Err(format!("unknown power request '{}' (cycle|on|off)", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PowerStatus {
    Success,
    InProgress,
    Error,
    #[serde(other)]
    Unknown,
}

/// Acknowledgment of a power command; feedback is polled by id.
#[derive(Debug, Clone, Deserialize)]
pub struct PowerCommandResponse {
    pub status: PowerStatus,
    pub command_id: u64,
}

#[derive(Deserialize)]
struct FeedbackResponse {
    status: PowerStatus,
}

/// Client for the power service.
pub struct PowerClient<C> {
    channel: C,
}

impl<C: RpcChannel> PowerClient<C> {
    pub fn new(channel: C) -> Self {
        Self { channel }
    }

    /// Issues a power command. Requires the motor lease; a
    /// `NavError::LeaseUse` means another client holds it.
    pub fn power_command(&self, request: PowerRequest) -> Result<PowerCommandResponse> {
        let value = self
            .channel
            .call("power.command", json!({"request": request}))?;
        Ok(serde_json::from_value(value)?)
    }

    /// Polls the status of a previously issued power command. An id the
    /// service has never seen yields `NavError::InvalidRequest`.
    pub fn power_command_feedback(&self, command_id: u64) -> Result<PowerStatus> {
        let value = self.channel.call(
            "power.command_feedback",
            json!({"command_id": command_id}),
        )?;
        let response: FeedbackResponse = serde_json::from_value(value)?;
        Ok(response.status)
    }
}
