// Copyright 2025 Navrec Authors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! The interactive map-recording session.
//!
//! [`RecordingSession`] owns the typed service clients, a cache of the
//! most recently downloaded graph, and the download writer. Its `run`
//! loop reads one command per line, dispatches it, and reports the
//! outcome; per-command failures never terminate the loop.

use std::io::{self, BufRead, Lines, Write};
use std::path::Path;
use std::thread;
use std::time::Duration;

use navrec_client::map_processing::AnchoringStatus;
use navrec_client::{
    GraphNavClient, ImageCapture, ImageClient, MapProcessingClient, RecordingClient, RpcChannel,
    SessionMetadata,
};
use navrec_common::map::{Edge, EdgeId, Graph, ObjectAnnotation, Waypoint};
use navrec_common::math::relative_transform;
use navrec_common::protocol::{FailureKind, NavError, Result};

use crate::command::{Command, LoopMode};
use crate::download::MapWriter;
use crate::graph_index::GraphIndex;

/// Image source used for object capture.
pub const DEFAULT_IMAGE_SOURCE: &str = "frontleft_fisheye_image";

/// The most recent graph snapshot plus the lookup maps built from it.
struct CachedGraph {
    graph: Graph,
    index: GraphIndex,
}

/// Pending object annotations for one captured image.
///
/// The capture context travels through the flow as an explicit value;
/// nothing about an in-progress capture lives outside it.
struct ObjectCapture {
    image: ImageCapture,
    annotations: Vec<ObjectAnnotation>,
}

impl ObjectCapture {
    fn new(image: ImageCapture) -> Self {
        Self {
            image,
            annotations: Vec::new(),
        }
    }

    /// Parses a `<name> <pixel-x> <pixel-y>` entry and records it,
    /// validating the pixel against the image bounds.
    fn add_entry(&mut self, line: &str) -> Result<String> {
        let tokens: Vec<&str> = line.split_whitespace().collect();
        let &[name, x, y] = tokens.as_slice() else {
            return Err(NavError::InvalidArguments(
                "enter one object per line as '<name> <pixel-x> <pixel-y>'".to_string(),
            ));
        };
        let pixel_x: u32 = x.parse().map_err(|_| {
            NavError::InvalidArguments(format!("'{}' is not a pixel coordinate", x))
        })?;
        let pixel_y: u32 = y.parse().map_err(|_| {
            NavError::InvalidArguments(format!("'{}' is not a pixel coordinate", y))
        })?;
        if pixel_x >= self.image.cols || pixel_y >= self.image.rows {
            return Err(NavError::InvalidArguments(format!(
                "pixel ({}, {}) is outside the {}x{} image",
                pixel_x, pixel_y, self.image.cols, self.image.rows
            )));
        }
        self.annotations.push(ObjectAnnotation {
            name: name.to_string(),
            pixel_x,
            pixel_y,
            image_source: self.image.source.clone(),
        });
        Ok(name.to_string())
    }
}

/// Recording service command-line session.
pub struct RecordingSession<C> {
    graph_nav: GraphNavClient<C>,
    recording: RecordingClient<C>,
    map_processing: MapProcessingClient<C>,
    image: ImageClient<C>,
    writer: MapWriter,
    image_source: String,
    stop_retry_interval: Duration,
    cache: Option<CachedGraph>,
}

impl<C: RpcChannel + Clone> RecordingSession<C> {
    pub fn new(
        channel: C,
        metadata: SessionMetadata,
        download_path: impl AsRef<Path>,
    ) -> Self {
        Self {
            graph_nav: GraphNavClient::new(channel.clone()),
            recording: RecordingClient::new(channel.clone(), metadata),
            map_processing: MapProcessingClient::new(channel.clone()),
            image: ImageClient::new(channel),
            writer: MapWriter::new(download_path),
            image_source: DEFAULT_IMAGE_SOURCE.to_string(),
            stop_retry_interval: Duration::from_secs(1),
            cache: None,
        }
    }

    /// Overrides the stop-recording poll interval (default 1 second).
    pub fn with_stop_retry_interval(mut self, interval: Duration) -> Self {
        self.stop_retry_interval = interval;
        self
    }

    /// Overrides the image source used for object capture.
    pub fn with_image_source(mut self, source: impl Into<String>) -> Self {
        self.image_source = source.into();
        self
    }

    /// The most recently downloaded graph, if any command has fetched one.
    pub fn cached_graph(&self) -> Option<&Graph> {
        self.cache.as_ref().map(|c| &c.graph)
    }

    /// Main loop. Reads commands until `q`, end of input, or an
    /// unrecoverable read error; every per-command failure is reported
    /// and the loop continues.
    pub fn run<B: BufRead>(&mut self, input: B) -> Result<()> {
        let mut lines = input.lines();
        loop {
            print_menu();
            let Some(line) = next_line(&mut lines)? else {
                break;
            };
            match Command::parse(&line) {
                Ok(None) => continue,
                Ok(Some(Command::Quit)) => break,
                Ok(Some(command)) => {
                    if let Err(err) = self.execute(command, &mut lines) {
                        match err.kind() {
                            FailureKind::Input => println!("{}", err),
                            _ => println!("Command failed: {}", err),
                        }
                    }
                }
                Err(err) => println!("{}", err),
            }
        }
        Ok(())
    }

    fn execute<B: BufRead>(&mut self, command: Command, lines: &mut Lines<B>) -> Result<()> {
        match command {
            Command::ClearMap => self.clear_map(),
            Command::StartRecording => self.start_recording(),
            Command::StopRecording => self.stop_recording(),
            Command::RecordStatus => self.record_status(),
            Command::CreateWaypoint { name } => {
                self.create_waypoint(name.as_deref().unwrap_or("default"))
            }
            Command::DownloadGraph => self.download_graph(),
            Command::ListGraph => self.list_graph(),
            Command::CreateEdge { from, to } => self.create_edge(&from, &to),
            Command::CreateLoop => self.create_loop(),
            Command::AutoCloseLoops { mode } => self.auto_close_loops(mode, lines),
            Command::OptimizeAnchoring => self.optimize_anchoring(),
            Command::AddObject => self.add_object(lines),
            // Quit is handled by the run loop.
            Command::Quit => Ok(()),
        }
    }

    /// Clear the state of the map on the robot, removing all waypoints
    /// and edges. The local cache goes with it.
    fn clear_map(&mut self) -> Result<()> {
        self.graph_nav.clear_graph()?;
        self.cache = None;
        println!("Cleared the map on the robot.");
        Ok(())
    }

    /// Before starting to record, check the state of the graph-nav
    /// system: with an existing non-empty map the robot must be
    /// localized to it, otherwise recording would fork the map.
    fn should_start_recording(&self) -> Result<bool> {
        let graph = self.graph_nav.download_graph()?;
        if !graph.waypoints.is_empty() {
            let localization = self.graph_nav.get_localization_state()?;
            if !localization.is_localized() {
                return Ok(false);
            }
        }
        Ok(true)
    }

    fn start_recording(&mut self) -> Result<()> {
        if !self.should_start_recording()? {
            println!("The system is not in the proper state to start recording.");
            println!("Try either clearing the map or localizing to the current map first.");
            return Ok(());
        }
        self.recording.start_recording()?;
        println!("Successfully started recording a map.");
        Ok(())
    }

    /// Stop recording. The service keeps processing in the background,
    /// so resubmit on a fixed interval while it reports not-ready;
    /// terminate on the first success or first non-transient error.
    fn stop_recording(&mut self) -> Result<()> {
        let mut first_iter = true;
        loop {
            match self.recording.stop_recording() {
                Ok(()) => {
                    println!("Successfully stopped recording a map.");
                    return Ok(());
                }
                Err(err) if err.is_transient() => {
                    if first_iter {
                        println!("Cleaning up recording...");
                        first_iter = false;
                    }
                    thread::sleep(self.stop_retry_interval);
                }
                Err(err) => return Err(err),
            }
        }
    }

    fn record_status(&mut self) -> Result<()> {
        if self.recording.get_record_status()? {
            println!("The recording service is on.");
        } else {
            println!("The recording service is off.");
        }
        Ok(())
    }

    fn create_waypoint(&mut self, name: &str) -> Result<()> {
        let waypoint_id = self.recording.create_waypoint(name)?;
        tracing::debug!(%waypoint_id, name, "created waypoint");
        println!("Successfully created waypoint '{}'.", name);
        Ok(())
    }

    /// Download the graph and all snapshots from the robot.
    fn download_graph(&mut self) -> Result<()> {
        let graph = self.graph_nav.download_graph()?;
        if graph.is_empty() {
            println!("The graph is empty: nothing to download.");
            return Ok(());
        }
        self.writer.write_graph(&graph)?;
        println!(
            "Graph downloaded with {} waypoints and {} edges",
            graph.waypoints.len(),
            graph.edges.len()
        );
        self.download_waypoint_snapshots(&graph)?;
        self.download_edge_snapshots(&graph)?;
        Ok(())
    }

    fn download_waypoint_snapshots(&self, graph: &Graph) -> Result<()> {
        let pending: Vec<&Waypoint> = graph
            .waypoints
            .iter()
            .filter(|w| !w.snapshot_id.is_empty())
            .collect();
        let total = pending.len();
        let mut downloaded = 0;
        for waypoint in pending {
            let data = match self.graph_nav.download_waypoint_snapshot(&waypoint.snapshot_id) {
                Ok(data) => data,
                Err(err) => {
                    // A missing snapshot should not abort the rest.
                    println!(
                        "Failed to download waypoint snapshot {}: {}",
                        waypoint.snapshot_id, err
                    );
                    continue;
                }
            };
            self.writer
                .write_waypoint_snapshot(&waypoint.snapshot_id, &data)?;
            downloaded += 1;
            println!(
                "Downloaded {} of the total {} waypoint snapshots.",
                downloaded, total
            );
        }
        Ok(())
    }

    fn download_edge_snapshots(&self, graph: &Graph) -> Result<()> {
        let pending: Vec<&Edge> = graph
            .edges
            .iter()
            .filter(|e| !e.snapshot_id.is_empty())
            .collect();
        let total = pending.len();
        let mut downloaded = 0;
        for edge in pending {
            let data = match self.graph_nav.download_edge_snapshot(&edge.snapshot_id) {
                Ok(data) => data,
                Err(err) => {
                    println!(
                        "Failed to download edge snapshot {}: {}",
                        edge.snapshot_id, err
                    );
                    continue;
                }
            };
            self.writer.write_edge_snapshot(&edge.snapshot_id, &data)?;
            downloaded += 1;
            println!(
                "Downloaded {} of the total {} edge snapshots.",
                downloaded, total
            );
        }
        Ok(())
    }

    /// Re-download the graph and rebuild the lookup maps from it.
    fn refresh_graph(&mut self) -> Result<()> {
        let graph = self.graph_nav.download_graph()?;
        let index = GraphIndex::build(&graph);
        self.cache = Some(CachedGraph { graph, index });
        Ok(())
    }

    fn cache(&self) -> Result<&CachedGraph> {
        self.cache.as_ref().ok_or_else(|| {
            NavError::InvalidResponse("graph cache missing after refresh".to_string())
        })
    }

    fn list_graph(&mut self) -> Result<()> {
        self.refresh_graph()?;
        let cache = self.cache()?;
        if cache.graph.is_empty() {
            println!("Empty graph.");
            return Ok(());
        }
        let localization = self.graph_nav.get_localization_state()?;
        cache
            .index
            .print_listing(&cache.graph, &localization.waypoint_id);
        Ok(())
    }

    /// Create a new edge between existing waypoints. References are
    /// re-resolved against a fresh snapshot so edges always join
    /// waypoints the robot currently knows about.
    fn create_edge(&mut self, from_ref: &str, to_ref: &str) -> Result<()> {
        self.refresh_graph()?;
        let cache = self.cache()?;
        let from_id = cache.index.resolve(&cache.graph, from_ref)?;
        let to_id = cache.index.resolve(&cache.graph, to_ref)?;
        self.create_edge_between(&from_id, &to_id)
    }

    fn create_edge_between(&self, from_id: &str, to_id: &str) -> Result<()> {
        let cache = self.cache()?;
        println!("Creating edge from {} to {}.", from_id, to_id);
        let from_wp = cache
            .graph
            .waypoint_by_id(from_id)
            .ok_or_else(|| NavError::WaypointNotFound(from_id.to_string()))?;
        let to_wp = cache
            .graph
            .waypoint_by_id(to_id)
            .ok_or_else(|| NavError::WaypointNotFound(to_id.to_string()))?;

        // Edge transform from kinematic odometry.
        let from_tform_to = relative_transform(
            &from_wp.waypoint_tform_odom,
            &to_wp.waypoint_tform_odom,
        );
        tracing::debug!(?from_tform_to, "computed edge transform");

        let edge = Edge {
            id: EdgeId {
                from_waypoint: from_id.to_string(),
                to_waypoint: to_id.to_string(),
            },
            from_tform_to,
            snapshot_id: String::new(),
        };
        self.recording.create_edge(&edge)?;
        println!("Created edge from {} to {}.", from_id, to_id);
        Ok(())
    }

    /// Create an edge from the chronologically last waypoint back to the
    /// first one.
    fn create_loop(&mut self) -> Result<()> {
        self.refresh_graph()?;
        let cache = self.cache()?;
        if cache.graph.waypoints.len() < 2 {
            println!(
                "Graph contains {} waypoints -- at least two are needed to create a loop.",
                cache.graph.waypoints.len()
            );
            return Ok(());
        }
        let sorted = GraphIndex::sorted_chrono(&cache.graph);
        let from_id = sorted[sorted.len() - 1].id.clone();
        let to_id = sorted[0].id.clone();
        self.create_edge_between(&from_id, &to_id)
    }

    fn auto_close_loops<B: BufRead>(
        &mut self,
        mode: Option<LoopMode>,
        lines: &mut Lines<B>,
    ) -> Result<()> {
        let mode = match mode {
            Some(mode) => mode,
            None => {
                println!("Options:");
                println!("(0) Close all loops.");
                println!("(1) Close only fiducial-based loops.");
                println!("(2) Close only odometry-based loops.");
                println!("(q) Back.");
                prompt();
                let Some(line) = next_line(lines)? else {
                    return Ok(());
                };
                let token = line.split_whitespace().next().unwrap_or("").to_string();
                if token == "q" {
                    return Ok(());
                }
                match LoopMode::parse(&token) {
                    Some(mode) => mode,
                    None => {
                        println!("Unrecognized option. Going back.");
                        return Ok(());
                    }
                }
            }
        };
        let (fiducial, odometry) = mode.flags();
        let response = self.map_processing.process_topology(fiducial, odometry)?;
        println!("Created {} new edge(s).", response.new_subgraph.edges.len());
        Ok(())
    }

    /// Call anchoring optimization on the server, producing a globally
    /// consistent reference frame for waypoints to be expressed in.
    fn optimize_anchoring(&mut self) -> Result<()> {
        let response = self.map_processing.process_anchoring()?;
        match response.status {
            AnchoringStatus::Ok => {
                println!("Optimized anchoring after {} iteration(s).", response.iteration);
            }
            status => println!("Error optimizing anchoring: {:?}", status),
        }
        Ok(())
    }

    /// Object-capture submenu. Only usable while recording is on.
    fn add_object<B: BufRead>(&mut self, lines: &mut Lines<B>) -> Result<()> {
        if !self.recording.get_record_status()? {
            println!("Start recording to capture objects.");
            return Ok(());
        }
        println!("Recording is on. Proceed to capture object nodes.");
        loop {
            println!("Options for capturing objects:");
            println!("(0 <name>) Create a waypoint here and capture objects at it.");
            println!("(1 <name>) Add objects to an existing named waypoint.");
            println!("(q) Back.");
            prompt();
            let Some(line) = next_line(lines)? else {
                return Ok(());
            };
            let mut tokens = line.split_whitespace();
            let Some(code) = tokens.next() else {
                continue;
            };
            let result = match code {
                "q" => return Ok(()),
                "0" => match tokens.next() {
                    Some(name) => self
                        .recording
                        .create_waypoint(name)
                        .map(|waypoint_id| {
                            println!("Successfully created waypoint '{}'.", name);
                            tracing::debug!(%waypoint_id, "capture waypoint created");
                        })
                        .and_then(|()| self.capture_objects(name, lines)),
                    None => Err(NavError::InvalidArguments(
                        "give the new waypoint a name".to_string(),
                    )),
                },
                "1" => match tokens.next() {
                    Some(name) => self.capture_objects(name, lines),
                    None => Err(NavError::InvalidArguments(
                        "name the waypoint to add objects to".to_string(),
                    )),
                },
                other => Err(NavError::InvalidArguments(format!(
                    "request '{}' is not in the known command dictionary",
                    other
                ))),
            };
            if let Err(err) = result {
                println!("{}", err);
            }
        }
    }

    /// Capture one image and attach the entered object annotations to the
    /// named waypoint, then upload the modified graph back to the robot.
    fn capture_objects<B: BufRead>(
        &mut self,
        waypoint_name: &str,
        lines: &mut Lines<B>,
    ) -> Result<()> {
        let mut graph = self.graph_nav.download_graph()?;
        let waypoint_id = graph
            .waypoints
            .iter()
            .find(|w| w.name == waypoint_name)
            .map(|w| w.id.clone())
            .ok_or_else(|| NavError::WaypointNotFound(waypoint_name.to_string()))?;

        let mut images = self
            .image
            .get_image_from_sources(&[self.image_source.as_str()])?;
        if images.len() != 1 {
            return Err(NavError::InvalidResponse(format!(
                "got {} images for 1 requested source",
                images.len()
            )));
        }
        let mut capture = ObjectCapture::new(images.remove(0));
        println!(
            "Captured a {}x{} image from {}.",
            capture.image.cols, capture.image.rows, capture.image.source
        );
        println!("Enter one object per line as '<name> <pixel-x> <pixel-y>'; 'e' to end.");
        loop {
            prompt();
            let Some(line) = next_line(lines)? else {
                break;
            };
            let trimmed = line.trim();
            if trimmed.eq_ignore_ascii_case("e") {
                break;
            }
            if trimmed.is_empty() {
                continue;
            }
            match capture.add_entry(trimmed) {
                Ok(name) => println!("Added object '{}'.", name),
                Err(err) => println!("{}", err),
            }
        }

        if capture.annotations.is_empty() {
            println!("No objects captured.");
            return Ok(());
        }
        let count = capture.annotations.len();
        let waypoint = graph
            .waypoint_by_id_mut(&waypoint_id)
            .ok_or_else(|| NavError::WaypointNotFound(waypoint_id.clone()))?;
        waypoint.objects.extend(capture.annotations);
        self.graph_nav.upload_graph(&graph)?;
        println!(
            "Successfully added {} object(s) to waypoint '{}'.",
            count, waypoint_name
        );
        Ok(())
    }
}

fn next_line<B: BufRead>(lines: &mut Lines<B>) -> Result<Option<String>> {
    match lines.next() {
        None => Ok(None),
        Some(line) => Ok(Some(line?)),
    }
}

fn prompt() {
    print!("> ");
    let _ = io::stdout().flush();
}

fn print_menu() {
    println!();
    println!("Options:");
    println!("(0) Clear map.");
    println!("(1) Start recording a map.");
    println!("(2) Stop recording a map.");
    println!("(3) Get the recording service's status.");
    println!("(4) Create a waypoint at the current robot location.");
    println!("(5) Download the map after recording.");
    println!("(6) List the waypoint ids and edge ids of the map on the robot.");
    println!("(7) Create new edge between existing waypoints using odometry.");
    println!("(8) Create new edge from the last waypoint to the first using odometry.");
    println!("(9) Automatically find and close loops.");
    println!("(a) Optimize the map's anchoring.");
    println!("(o) Add object annotations to a waypoint.");
    println!("(q) Exit.");
    prompt();
}
