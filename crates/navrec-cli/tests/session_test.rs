//! Dispatcher tests against a scripted in-process channel.
//!
//! The fake channel records every call and answers from a per-method
//! script, so the tests can pin down exactly which remote operations a
//! command issues and how retries behave.

use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use std::rc::Rc;
use std::time::Duration;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use navrec_client::channel::unwrap_response;
use navrec_client::{RpcChannel, SessionMetadata};
use navrec_cli::session::RecordingSession;
use navrec_common::map::{Edge, EdgeId, Graph, Waypoint};
use navrec_common::math::{Quat, SE3Pose, Vec3};
use navrec_common::protocol::{ErrorCode, Response, Result};
use serde_json::{json, Value};

// ============================================================================
// Fake channel
// ============================================================================

type Handler = Box<dyn Fn(&Value) -> Response>;

#[derive(Default)]
struct MethodScript {
    queue: VecDeque<Response>,
    default: Option<Response>,
    handler: Option<Handler>,
}

#[derive(Default)]
struct Inner {
    calls: Vec<(String, Value)>,
    scripts: HashMap<String, MethodScript>,
}

/// Scripted channel: per-method response queues, defaults, or handlers.
/// Cloning shares the script and the call log.
#[derive(Clone, Default)]
struct FakeChannel {
    inner: Rc<RefCell<Inner>>,
}

impl FakeChannel {
    fn new() -> Self {
        Self::default()
    }

    fn script(&self, method: &str) -> std::cell::RefMut<'_, MethodScript> {
        std::cell::RefMut::map(self.inner.borrow_mut(), |inner| {
            inner.scripts.entry(method.to_string()).or_default()
        })
    }

    /// Answers every call to `method` with a success result.
    fn on(&self, method: &str, result: Value) {
        self.script(method).default = Some(Response::success(0, result));
    }

    /// Answers every call to `method` with an error.
    fn on_error(&self, method: &str, code: ErrorCode, message: &str) {
        self.script(method).default = Some(Response::error(0, code, message));
    }

    /// Queues a one-shot success result for `method`; queued entries are
    /// consumed before the default.
    fn push(&self, method: &str, result: Value) {
        self.script(method).queue.push_back(Response::success(0, result));
    }

    /// Answers calls to `method` by computing a response from the args.
    fn on_fn(&self, method: &str, handler: impl Fn(&Value) -> Response + 'static) {
        self.script(method).handler = Some(Box::new(handler));
    }

    fn calls(&self, method: &str) -> usize {
        self.inner
            .borrow()
            .calls
            .iter()
            .filter(|(m, _)| m == method)
            .count()
    }

    fn call_args(&self, method: &str) -> Vec<Value> {
        self.inner
            .borrow()
            .calls
            .iter()
            .filter(|(m, _)| m == method)
            .map(|(_, args)| args.clone())
            .collect()
    }

    fn total_calls(&self) -> usize {
        self.inner.borrow().calls.len()
    }
}

impl RpcChannel for FakeChannel {
    fn call(&self, method: &str, args: Value) -> Result<Value> {
        let response = {
            let mut inner = self.inner.borrow_mut();
            inner.calls.push((method.to_string(), args.clone()));
            let script = inner
                .scripts
                .get_mut(method)
                .unwrap_or_else(|| panic!("unexpected call to {method}"));
            script
                .queue
                .pop_front()
                .or_else(|| script.handler.as_ref().map(|handler| handler(&args)))
                .or_else(|| script.default.clone())
                .unwrap_or_else(|| panic!("no scripted response left for {method}"))
        };
        unwrap_response(response)
    }
}

// ============================================================================
// Test helpers
// ============================================================================

fn waypoint(id: &str, name: &str, created_at: f64, snapshot_id: &str) -> Waypoint {
    Waypoint {
        id: id.to_string(),
        name: name.to_string(),
        waypoint_tform_odom: SE3Pose::new(Vec3::new(created_at, 0.0, 0.0), Quat::identity()),
        snapshot_id: snapshot_id.to_string(),
        created_at_secs: created_at,
        objects: vec![],
    }
}

fn graph_value(graph: &Graph) -> Value {
    serde_json::to_value(graph).unwrap()
}

fn new_session(channel: &FakeChannel, download_path: &std::path::Path) -> RecordingSession<FakeChannel> {
    RecordingSession::new(
        channel.clone(),
        SessionMetadata::new("test-session", "tester"),
        download_path,
    )
    .with_stop_retry_interval(Duration::from_millis(1))
}

fn run_session(channel: &FakeChannel, input: &str) -> RecordingSession<FakeChannel> {
    let dir = tempfile::tempdir().unwrap();
    let mut session = new_session(channel, dir.path());
    session.run(input.as_bytes()).unwrap();
    session
}

// ============================================================================
// Dispatch
// ============================================================================

#[test]
fn test_dispatch_invokes_exactly_one_handler_per_line() {
    let channel = FakeChannel::new();
    channel.on("recording.status", json!({"is_recording": false}));

    run_session(&channel, "3\nq\n");

    assert_eq!(channel.calls("recording.status"), 1);
    assert_eq!(channel.total_calls(), 1);
}

#[test]
fn test_unknown_command_reports_and_leaves_state_unchanged() {
    let channel = FakeChannel::new();

    let session = run_session(&channel, "z\nfrobnicate now\nq\n");

    // No remote call was made and the graph cache is untouched.
    assert_eq!(channel.total_calls(), 0);
    assert!(session.cached_graph().is_none());
}

#[test]
fn test_blank_lines_are_ignored() {
    let channel = FakeChannel::new();
    run_session(&channel, "\n   \nq\n");
    assert_eq!(channel.total_calls(), 0);
}

#[test]
fn test_session_ends_at_end_of_input() {
    let channel = FakeChannel::new();
    // No quit command; the loop must still terminate.
    run_session(&channel, "");
    assert_eq!(channel.total_calls(), 0);
}

// ============================================================================
// Recording control
// ============================================================================

#[test]
fn test_start_recording_refused_when_not_localized() {
    let channel = FakeChannel::new();
    let graph = Graph {
        waypoints: vec![waypoint("aa-bb-1", "start", 1.0, "")],
        edges: vec![],
    };
    channel.on("graph_nav.download_graph", graph_value(&graph));
    channel.on("graph_nav.get_localization_state", json!({"waypoint_id": ""}));

    run_session(&channel, "1\nq\n");

    // The guard refuses; recording.start is never issued.
    assert_eq!(channel.calls("recording.start"), 0);
}

#[test]
fn test_start_recording_on_empty_graph() {
    let channel = FakeChannel::new();
    channel.on("graph_nav.download_graph", graph_value(&Graph::default()));
    channel.on("recording.start", json!({"status": "ok"}));

    run_session(&channel, "1\nq\n");

    assert_eq!(channel.calls("recording.start"), 1);
    // No localization check needed for an empty graph.
    assert_eq!(channel.calls("graph_nav.get_localization_state"), 0);
    // The session metadata travels with the start request.
    let args = channel.call_args("recording.start");
    assert_eq!(
        args[0]["recording_environment"]["session_name"],
        json!("test-session")
    );
}

#[test]
fn test_create_waypoint_uses_default_and_custom_names() {
    let channel = FakeChannel::new();
    channel.on(
        "recording.create_waypoint",
        json!({"status": "ok", "waypoint_id": "wp-1"}),
    );

    run_session(&channel, "4\n4 doorway\nq\n");

    let args = channel.call_args("recording.create_waypoint");
    assert_eq!(args.len(), 2);
    assert_eq!(args[0]["waypoint_name"], json!("default"));
    assert_eq!(args[1]["waypoint_name"], json!("doorway"));
}

#[test]
fn test_stop_recording_retries_while_not_ready() {
    let channel = FakeChannel::new();
    // Not ready three times, then success: exactly four stop calls.
    for _ in 0..3 {
        channel.push("recording.stop", json!({"status": "not_ready_yet"}));
    }
    channel.push("recording.stop", json!({"status": "ok"}));

    run_session(&channel, "2\nq\n");

    assert_eq!(channel.calls("recording.stop"), 4);
}

#[test]
fn test_stop_recording_ends_on_non_transient_error() {
    let channel = FakeChannel::new();
    channel.on_error("recording.stop", ErrorCode::LeaseUse, "lease is held elsewhere");

    run_session(&channel, "2\nq\n");

    // First non-transient failure ends the retry loop, and the session
    // loop survives to process the quit command.
    assert_eq!(channel.calls("recording.stop"), 1);
}

// ============================================================================
// Edges and loops
// ============================================================================

fn two_waypoint_graph() -> Graph {
    Graph {
        waypoints: vec![
            waypoint("alfa-bravo-1111", "start", 10.0, ""),
            waypoint("charlie-delta-2222", "door", 20.0, ""),
        ],
        edges: vec![],
    }
}

#[test]
fn test_create_edge_resolves_names_and_submits() {
    let channel = FakeChannel::new();
    channel.on("graph_nav.download_graph", graph_value(&two_waypoint_graph()));
    channel.on("recording.create_edge", json!({"status": "ok"}));

    run_session(&channel, "7 start door\nq\n");

    assert_eq!(channel.calls("recording.create_edge"), 1);
    let args = channel.call_args("recording.create_edge");
    assert_eq!(args[0]["edge"]["id"]["from_waypoint"], json!("alfa-bravo-1111"));
    assert_eq!(args[0]["edge"]["id"]["to_waypoint"], json!("charlie-delta-2222"));
    // Pure translation between the two poses: from (10,0,0) to (20,0,0).
    assert_eq!(
        args[0]["edge"]["from_tform_to"]["position"]["x"],
        json!(-10.0)
    );
}

#[test]
fn test_create_edge_by_short_code() {
    let channel = FakeChannel::new();
    channel.on("graph_nav.download_graph", graph_value(&two_waypoint_graph()));
    channel.on("recording.create_edge", json!({"status": "ok"}));

    run_session(&channel, "7 ab cd\nq\n");

    let args = channel.call_args("recording.create_edge");
    assert_eq!(args[0]["edge"]["id"]["from_waypoint"], json!("alfa-bravo-1111"));
    assert_eq!(args[0]["edge"]["id"]["to_waypoint"], json!("charlie-delta-2222"));
}

#[test]
fn test_create_edge_unresolvable_reference_fails_visibly() {
    let channel = FakeChannel::new();
    channel.on("graph_nav.download_graph", graph_value(&two_waypoint_graph()));

    run_session(&channel, "7 start nowhere\nq\n");

    // The reference does not resolve; no edge-creation request is made
    // and the session keeps running.
    assert_eq!(channel.calls("recording.create_edge"), 0);
}

#[test]
fn test_create_edge_wrong_argument_count_is_input_error() {
    let channel = FakeChannel::new();

    run_session(&channel, "7 only-one\nq\n");

    // Argument validation fails before any remote call.
    assert_eq!(channel.total_calls(), 0);
}

#[test]
fn test_create_loop_refuses_below_two_waypoints() {
    let channel = FakeChannel::new();
    let graph = Graph {
        waypoints: vec![waypoint("alfa-bravo-1111", "start", 10.0, "")],
        edges: vec![],
    };
    channel.on("graph_nav.download_graph", graph_value(&graph));

    run_session(&channel, "8\nq\n");

    assert_eq!(channel.calls("recording.create_edge"), 0);
}

#[test]
fn test_create_loop_connects_last_waypoint_to_first() {
    let channel = FakeChannel::new();
    let graph = Graph {
        waypoints: vec![
            // Deliberately out of order; chronology decides.
            waypoint("charlie-delta-2222", "mid", 20.0, ""),
            waypoint("echo-foxtrot-3333", "newest", 30.0, ""),
            waypoint("alfa-bravo-1111", "oldest", 10.0, ""),
        ],
        edges: vec![],
    };
    channel.on("graph_nav.download_graph", graph_value(&graph));
    channel.on("recording.create_edge", json!({"status": "ok"}));

    run_session(&channel, "8\nq\n");

    let args = channel.call_args("recording.create_edge");
    assert_eq!(args.len(), 1);
    assert_eq!(args[0]["edge"]["id"]["from_waypoint"], json!("echo-foxtrot-3333"));
    assert_eq!(args[0]["edge"]["id"]["to_waypoint"], json!("alfa-bravo-1111"));
}

// ============================================================================
// Download
// ============================================================================

#[test]
fn test_download_writes_every_snapshot_byte_identically() {
    let channel = FakeChannel::new();
    let graph = Graph {
        waypoints: vec![
            waypoint("alfa-bravo-1111", "one", 1.0, "snap-w1"),
            waypoint("charlie-delta-2222", "two", 2.0, "snap-w2"),
            waypoint("echo-foxtrot-3333", "three", 3.0, "snap-w3"),
            // No snapshot recorded here; nothing to download for it.
            waypoint("golf-hotel-4444", "four", 4.0, ""),
        ],
        edges: vec![Edge {
            id: EdgeId {
                from_waypoint: "alfa-bravo-1111".to_string(),
                to_waypoint: "charlie-delta-2222".to_string(),
            },
            from_tform_to: SE3Pose::identity(),
            snapshot_id: "snap-e1".to_string(),
        }],
    };
    channel.on("graph_nav.download_graph", graph_value(&graph));
    channel.on_fn("graph_nav.download_waypoint_snapshot", |args| {
        let id = args["snapshot_id"].as_str().unwrap();
        let payload = STANDARD.encode(format!("waypoint-bytes-{id}"));
        Response::success(0, json!({"data": payload}))
    });
    channel.on_fn("graph_nav.download_edge_snapshot", |args| {
        let id = args["snapshot_id"].as_str().unwrap();
        let payload = STANDARD.encode(format!("edge-bytes-{id}"));
        Response::success(0, json!({"data": payload}))
    });

    let dir = tempfile::tempdir().unwrap();
    let mut session = new_session(&channel, dir.path());
    session.run("5\nq\n".as_bytes()).unwrap();

    let snapshot_dir = dir.path().join("downloaded_graph").join("waypoint_snapshots");
    let mut entries: Vec<String> = std::fs::read_dir(&snapshot_dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    entries.sort();
    // Exactly one file per waypoint with a non-empty snapshot id.
    assert_eq!(entries, vec!["snap-w1", "snap-w2", "snap-w3"]);
    for id in &entries {
        let bytes = std::fs::read(snapshot_dir.join(id)).unwrap();
        assert_eq!(bytes, format!("waypoint-bytes-{id}").into_bytes());
    }

    let edge_bytes = std::fs::read(
        dir.path()
            .join("downloaded_graph")
            .join("edge_snapshots")
            .join("snap-e1"),
    )
    .unwrap();
    assert_eq!(edge_bytes, b"edge-bytes-snap-e1");

    // The graph file itself round-trips.
    let graph_bytes =
        std::fs::read(dir.path().join("downloaded_graph").join("graph")).unwrap();
    let written: Graph = serde_json::from_slice(&graph_bytes).unwrap();
    assert_eq!(written, graph);
}

#[test]
fn test_download_of_empty_graph_reports_and_continues() {
    let channel = FakeChannel::new();
    channel.on("graph_nav.download_graph", graph_value(&Graph::default()));

    let dir = tempfile::tempdir().unwrap();
    let mut session = new_session(&channel, dir.path());
    session.run("5\nq\n".as_bytes()).unwrap();

    // No files are written for an empty graph and the loop continues.
    assert!(!dir.path().join("downloaded_graph").exists());
    assert_eq!(channel.calls("graph_nav.download_waypoint_snapshot"), 0);
}

#[test]
fn test_download_skips_failed_snapshots_and_keeps_going() {
    let channel = FakeChannel::new();
    let graph = Graph {
        waypoints: vec![
            waypoint("alfa-bravo-1111", "one", 1.0, "snap-bad"),
            waypoint("charlie-delta-2222", "two", 2.0, "snap-good"),
        ],
        edges: vec![],
    };
    channel.on("graph_nav.download_graph", graph_value(&graph));
    channel.on_fn("graph_nav.download_waypoint_snapshot", |args| {
        if args["snapshot_id"] == json!("snap-bad") {
            Response::error(0, ErrorCode::Service, "snapshot lost")
        } else {
            Response::success(0, json!({"data": STANDARD.encode("payload")}))
        }
    });

    let dir = tempfile::tempdir().unwrap();
    let mut session = new_session(&channel, dir.path());
    session.run("5\nq\n".as_bytes()).unwrap();

    let snapshot_dir = dir.path().join("downloaded_graph").join("waypoint_snapshots");
    assert!(!snapshot_dir.join("snap-bad").exists());
    assert!(snapshot_dir.join("snap-good").exists());
}

// ============================================================================
// Map processing
// ============================================================================

#[test]
fn test_auto_close_loops_with_inline_mode() {
    let channel = FakeChannel::new();
    channel.on(
        "map_processing.process_topology",
        json!({"new_subgraph": {"waypoints": [], "edges": []}}),
    );

    run_session(&channel, "9 1\nq\n");

    let args = channel.call_args("map_processing.process_topology");
    assert_eq!(args[0]["params"]["do_fiducial_loop_closure"], json!(true));
    assert_eq!(args[0]["params"]["do_odometry_loop_closure"], json!(false));
}

#[test]
fn test_auto_close_loops_prompts_for_mode() {
    let channel = FakeChannel::new();
    channel.on(
        "map_processing.process_topology",
        json!({"new_subgraph": {"waypoints": [], "edges": []}}),
    );

    // "9" alone prompts; the next line carries the sub-choice.
    run_session(&channel, "9\n0\nq\n");

    let args = channel.call_args("map_processing.process_topology");
    assert_eq!(args[0]["params"]["do_fiducial_loop_closure"], json!(true));
    assert_eq!(args[0]["params"]["do_odometry_loop_closure"], json!(true));
}

#[test]
fn test_optimize_anchoring_reports_iterations() {
    let channel = FakeChannel::new();
    channel.on(
        "map_processing.process_anchoring",
        json!({"status": "ok", "iteration": 7}),
    );

    run_session(&channel, "a\nq\n");

    assert_eq!(channel.calls("map_processing.process_anchoring"), 1);
    let args = channel.call_args("map_processing.process_anchoring");
    assert_eq!(args[0]["modify_anchoring_on_server"], json!(true));
}

// ============================================================================
// Object capture
// ============================================================================

#[test]
fn test_object_capture_requires_recording() {
    let channel = FakeChannel::new();
    channel.on("recording.status", json!({"is_recording": false}));

    run_session(&channel, "o\nq\n");

    // Refused before the submenu; no image or graph traffic.
    assert_eq!(channel.calls("image.get_image_from_sources"), 0);
    assert_eq!(channel.calls("graph_nav.download_graph"), 0);
}

#[test]
fn test_object_capture_uploads_annotated_graph() {
    let channel = FakeChannel::new();
    channel.on("recording.status", json!({"is_recording": true}));
    channel.on("graph_nav.download_graph", graph_value(&two_waypoint_graph()));
    channel.on(
        "image.get_image_from_sources",
        json!({"images": [{
            "source": "frontleft_fisheye_image",
            "rows": 480,
            "cols": 640,
            "pixel_format": "greyscale8",
            "data": STANDARD.encode([0u8; 4]),
        }]}),
    );
    channel.on("graph_nav.upload_graph", json!({}));

    run_session(&channel, "o\n1 door\nvalve 100 200\ne\nq\nq\n");

    assert_eq!(channel.calls("graph_nav.upload_graph"), 1);
    let args = channel.call_args("graph_nav.upload_graph");
    let uploaded: Graph = serde_json::from_value(args[0]["graph"].clone()).unwrap();
    let door = uploaded.waypoint_by_id("charlie-delta-2222").unwrap();
    assert_eq!(door.objects.len(), 1);
    assert_eq!(door.objects[0].name, "valve");
    assert_eq!(door.objects[0].pixel_x, 100);
    assert_eq!(door.objects[0].pixel_y, 200);
    assert_eq!(door.objects[0].image_source, "frontleft_fisheye_image");
}

#[test]
fn test_object_capture_rejects_out_of_bounds_pixels() {
    let channel = FakeChannel::new();
    channel.on("recording.status", json!({"is_recording": true}));
    channel.on("graph_nav.download_graph", graph_value(&two_waypoint_graph()));
    channel.on(
        "image.get_image_from_sources",
        json!({"images": [{
            "source": "frontleft_fisheye_image",
            "rows": 4,
            "cols": 4,
            "pixel_format": "greyscale8",
            "data": STANDARD.encode([0u8; 16]),
        }]}),
    );

    // The only entry is out of bounds, so nothing is captured and no
    // upload happens.
    run_session(&channel, "o\n1 door\nvalve 100 200\ne\nq\nq\n");

    assert_eq!(channel.calls("graph_nav.upload_graph"), 0);
}

// ============================================================================
// Clear map
// ============================================================================

#[test]
fn test_clear_map_drops_the_cache() {
    let channel = FakeChannel::new();
    channel.on("graph_nav.download_graph", graph_value(&two_waypoint_graph()));
    channel.on("graph_nav.get_localization_state", json!({"waypoint_id": ""}));
    channel.on("graph_nav.clear_graph", json!({}));

    // List first (fills the cache), then clear.
    let session = run_session(&channel, "6\n0\nq\n");

    assert_eq!(channel.calls("graph_nav.clear_graph"), 1);
    assert!(session.cached_graph().is_none());
}
