//! Writing downloaded maps to disk.
//!
//! Layout under the configured download path:
//!
//! ```text
//! <download-path>/downloaded_graph/
//!     graph                      # the serialized topology
//!     waypoint_snapshots/<id>    # one file per waypoint snapshot
//!     edge_snapshots/<id>        # one file per edge snapshot
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use navrec_common::map::Graph;
use navrec_common::protocol::Result;

/// Writes graph and snapshot blobs under a download root, creating
/// directories as needed.
pub struct MapWriter {
    root: PathBuf,
}

impl MapWriter {
    /// `download_path` is the user-configured location; everything lands
    /// in a `downloaded_graph` directory beneath it.
    pub fn new(download_path: impl AsRef<Path>) -> Self {
        Self {
            root: download_path.as_ref().join("downloaded_graph"),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Writes the serialized graph topology.
    pub fn write_graph(&self, graph: &Graph) -> Result<PathBuf> {
        let bytes = serde_json::to_vec_pretty(graph)?;
        self.write_bytes(&self.root, "graph", &bytes)
    }

    pub fn write_waypoint_snapshot(&self, snapshot_id: &str, data: &[u8]) -> Result<PathBuf> {
        self.write_bytes(&self.root.join("waypoint_snapshots"), snapshot_id, data)
    }

    pub fn write_edge_snapshot(&self, snapshot_id: &str, data: &[u8]) -> Result<PathBuf> {
        self.write_bytes(&self.root.join("edge_snapshots"), snapshot_id, data)
    }

    fn write_bytes(&self, dir: &Path, name: &str, data: &[u8]) -> Result<PathBuf> {
        fs::create_dir_all(dir)?;
        let path = dir.join(name);
        fs::write(&path, data)?;
        Ok(path)
    }
}
