//! Graph-nav map data model.
//!
//! A `Graph` is an immutable-until-redownloaded snapshot of the topology
//! on the robot: waypoints with local poses, and directed edges carrying
//! relative transforms. Snapshot payloads (raw sensor bundles) are stored
//! separately and referenced by `snapshot_id`.

use serde::{Deserialize, Serialize};

use crate::math::SE3Pose;

/// A named pose anchor in the navigation graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Waypoint {
    /// Unique identifier assigned by the recording service.
    pub id: String,
    /// Human-readable annotation name; may be empty.
    #[serde(default)]
    pub name: String,
    /// Pose of this waypoint expressed in the kinematic-odometry frame.
    pub waypoint_tform_odom: SE3Pose,
    /// Identifier of the sensor-data snapshot; empty when none exists.
    #[serde(default)]
    pub snapshot_id: String,
    /// Creation time, seconds since the epoch. Used for chronological
    /// ordering when closing the recording loop.
    #[serde(default)]
    pub created_at_secs: f64,
    /// Object annotations captured at this waypoint.
    #[serde(default)]
    pub objects: Vec<ObjectAnnotation>,
}

/// Directed edge identifier: an ordered pair of waypoint ids.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EdgeId {
    pub from_waypoint: String,
    pub to_waypoint: String,
}

/// A directed, transform-carrying connection between two waypoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    pub id: EdgeId,
    /// Transform mapping the to-waypoint frame into the from-waypoint frame.
    pub from_tform_to: SE3Pose,
    #[serde(default)]
    pub snapshot_id: String,
}

/// An object tagged at a waypoint: a named pixel location in an image
/// captured from one of the robot's sources.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectAnnotation {
    pub name: String,
    pub pixel_x: u32,
    pub pixel_y: u32,
    /// Image source the annotation was captured from.
    pub image_source: String,
}

/// Snapshot of the topology currently on the robot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Graph {
    #[serde(default)]
    pub waypoints: Vec<Waypoint>,
    #[serde(default)]
    pub edges: Vec<Edge>,
}

impl Graph {
    pub fn is_empty(&self) -> bool {
        self.waypoints.is_empty()
    }

    /// Looks up a waypoint by its full id.
    pub fn waypoint_by_id(&self, id: &str) -> Option<&Waypoint> {
        self.waypoints.iter().find(|w| w.id == id)
    }

    pub fn waypoint_by_id_mut(&mut self, id: &str) -> Option<&mut Waypoint> {
        self.waypoints.iter_mut().find(|w| w.id == id)
    }
}

/// Where the robot believes it is within the graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct LocalizationState {
    /// Waypoint the robot is localized to; empty when not localized.
    #[serde(default)]
    pub waypoint_id: String,
}

impl LocalizationState {
    pub fn is_localized(&self) -> bool {
        !self.waypoint_id.is_empty()
    }
}
