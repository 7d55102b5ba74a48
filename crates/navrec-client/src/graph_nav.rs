use navrec_common::map::{Graph, LocalizationState};
use navrec_common::protocol::Result;
use serde::Deserialize;
use serde_json::json;

use crate::channel::RpcChannel;

/// Client for the graph-nav service: graph download/upload, localization
/// state, and snapshot retrieval.
pub struct GraphNavClient<C> {
    channel: C,
}

#[derive(Deserialize)]
struct SnapshotResponse {
    #[serde(with = "navrec_common::b64")]
    data: Vec<u8>,
}

impl<C: RpcChannel> GraphNavClient<C> {
    pub fn new(channel: C) -> Self {
        Self { channel }
    }

    /// Downloads the graph currently on the robot. An empty graph is a
    /// valid result, not an error.
    pub fn download_graph(&self) -> Result<Graph> {
        let value = self.channel.call("graph_nav.download_graph", json!({}))?;
        Ok(serde_json::from_value(value)?)
    }

    pub fn get_localization_state(&self) -> Result<LocalizationState> {
        let value = self
            .channel
            .call("graph_nav.get_localization_state", json!({}))?;
        Ok(serde_json::from_value(value)?)
    }

    /// Removes all waypoints and edges from the map on the robot.
    pub fn clear_graph(&self) -> Result<()> {
        self.channel.call("graph_nav.clear_graph", json!({}))?;
        Ok(())
    }

    /// Downloads the sensor-data bundle recorded at a waypoint.
    pub fn download_waypoint_snapshot(&self, snapshot_id: &str) -> Result<Vec<u8>> {
        let value = self.channel.call(
            "graph_nav.download_waypoint_snapshot",
            json!({"snapshot_id": snapshot_id}),
        )?;
        let snapshot: SnapshotResponse = serde_json::from_value(value)?;
        Ok(snapshot.data)
    }

    /// Downloads the sensor-data bundle recorded along an edge.
    pub fn download_edge_snapshot(&self, snapshot_id: &str) -> Result<Vec<u8>> {
        let value = self.channel.call(
            "graph_nav.download_edge_snapshot",
            json!({"snapshot_id": snapshot_id}),
        )?;
        let snapshot: SnapshotResponse = serde_json::from_value(value)?;
        Ok(snapshot.data)
    }

    /// Uploads a modified graph back to the robot.
    pub fn upload_graph(&self, graph: &Graph) -> Result<()> {
        self.channel
            .call("graph_nav.upload_graph", json!({"graph": graph}))?;
        Ok(())
    }
}
