use navrec_common::map::Edge;
use navrec_common::protocol::{NavError, Result};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::channel::RpcChannel;

/// Status codes reported by the recording service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordingStatus {
    Ok,
    /// Background processing has not finished; retry shortly.
    NotReadyYet,
    CouldNotCreateWaypoint,
    MissingWaypoint,
    MapTooLarge,
    NotLocalizedToEndOfMap,
    #[serde(other)]
    Unknown,
}

/// Metadata attached to a recording session: who is recording and under
/// what name. Set once at session start, read-only thereafter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionMetadata {
    pub session_name: String,
    pub client_username: String,
    pub client_id: String,
}

impl SessionMetadata {
    pub fn new(
        session_name: impl Into<String>,
        client_username: impl Into<String>,
    ) -> Self {
        Self {
            session_name: session_name.into(),
            client_username: client_username.into(),
            client_id: "navrec".to_string(),
        }
    }
}

#[derive(Deserialize)]
struct StatusResponse {
    status: RecordingStatus,
}

#[derive(Deserialize)]
struct CreateWaypointResponse {
    status: RecordingStatus,
    #[serde(default)]
    waypoint_id: String,
}

#[derive(Deserialize)]
struct RecordStatusResponse {
    is_recording: bool,
}

/// Client for the graph-nav recording service: start/stop recording and
/// waypoint/edge creation.
pub struct RecordingClient<C> {
    channel: C,
    metadata: SessionMetadata,
}

impl<C: RpcChannel> RecordingClient<C> {
    pub fn new(channel: C, metadata: SessionMetadata) -> Self {
        Self { channel, metadata }
    }

    pub fn metadata(&self) -> &SessionMetadata {
        &self.metadata
    }

    /// Starts recording a map. The session metadata travels with the
    /// request so the map carries who recorded it.
    pub fn start_recording(&self) -> Result<()> {
        let value = self.channel.call(
            "recording.start",
            json!({"recording_environment": self.metadata}),
        )?;
        let response: StatusResponse = serde_json::from_value(value)?;
        match response.status {
            RecordingStatus::Ok => Ok(()),
            status => Err(NavError::Service(format!(
                "start recording failed with status {:?}",
                status
            ))),
        }
    }

    /// Stops recording.
    ///
    /// The service keeps processing in the background after the last
    /// waypoint; while it does, it answers `not_ready_yet`, surfaced here
    /// as the transient [`NavError::NotReadyYet`] so callers can poll.
    pub fn stop_recording(&self) -> Result<()> {
        let value = self.channel.call("recording.stop", json!({}))?;
        let response: StatusResponse = serde_json::from_value(value)?;
        match response.status {
            RecordingStatus::Ok => Ok(()),
            RecordingStatus::NotReadyYet => Err(NavError::NotReadyYet),
            status => Err(NavError::Service(format!(
                "stop recording failed with status {:?}",
                status
            ))),
        }
    }

    /// Whether the recording service is currently on.
    pub fn get_record_status(&self) -> Result<bool> {
        let value = self.channel.call("recording.status", json!({}))?;
        let response: RecordStatusResponse = serde_json::from_value(value)?;
        Ok(response.is_recording)
    }

    /// Creates a waypoint at the robot's current location. Returns the
    /// new waypoint id.
    pub fn create_waypoint(&self, name: &str) -> Result<String> {
        let value = self
            .channel
            .call("recording.create_waypoint", json!({"waypoint_name": name}))?;
        let response: CreateWaypointResponse = serde_json::from_value(value)?;
        match response.status {
            RecordingStatus::Ok => Ok(response.waypoint_id),
            status => Err(NavError::Service(format!(
                "could not create waypoint with status {:?}",
                status
            ))),
        }
    }

    /// Adds an edge between two existing waypoints.
    pub fn create_edge(&self, edge: &Edge) -> Result<()> {
        let value = self
            .channel
            .call("recording.create_edge", json!({"edge": edge}))?;
        let response: StatusResponse = serde_json::from_value(value)?;
        match response.status {
            RecordingStatus::Ok => Ok(()),
            RecordingStatus::MissingWaypoint => Err(NavError::Service(
                "edge references a waypoint the map no longer contains".to_string(),
            )),
            status => Err(NavError::Service(format!(
                "create edge failed with status {:?}",
                status
            ))),
        }
    }
}
