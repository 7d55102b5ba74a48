use navrec_common::map::Graph;
use navrec_common::protocol::Result;
use serde::Deserialize;
use serde_json::json;

use crate::channel::RpcChannel;

/// Result of a topology-processing (loop closure) run. The service
/// returns the subgraph of edges it added.
#[derive(Debug, Clone, Deserialize)]
pub struct ProcessTopologyResponse {
    #[serde(default)]
    pub new_subgraph: Graph,
}

/// Result of an anchoring-optimization run.
#[derive(Debug, Clone, Deserialize)]
pub struct ProcessAnchoringResponse {
    pub status: AnchoringStatus,
    /// Number of solver iterations the optimization took.
    #[serde(default)]
    pub iteration: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnchoringStatus {
    Ok,
    OptimizationFailure,
    InvalidGraph,
    MaxIterations,
    #[serde(other)]
    Unknown,
}

/// Client for the map-processing service: loop closure and anchoring
/// optimization. Both calls are synchronous request/response; the robot
/// does the solving.
pub struct MapProcessingClient<C> {
    channel: C,
}

impl<C: RpcChannel> MapProcessingClient<C> {
    pub fn new(channel: C) -> Self {
        Self { channel }
    }

    /// Finds and closes loops in the graph on the server, modifying the
    /// map in place. `fiducial` and `odometry` select which loop-closure
    /// strategies run.
    pub fn process_topology(&self, fiducial: bool, odometry: bool) -> Result<ProcessTopologyResponse> {
        let value = self.channel.call(
            "map_processing.process_topology",
            json!({
                "params": {
                    "do_fiducial_loop_closure": fiducial,
                    "do_odometry_loop_closure": odometry,
                },
                "modify_map_on_server": true,
            }),
        )?;
        Ok(serde_json::from_value(value)?)
    }

    /// Optimizes the map's anchoring on the server, producing a globally
    /// consistent reference frame for all waypoints.
    pub fn process_anchoring(&self) -> Result<ProcessAnchoringResponse> {
        let value = self.channel.call(
            "map_processing.process_anchoring",
            json!({"modify_anchoring_on_server": true}),
        )?;
        Ok(serde_json::from_value(value)?)
    }
}
