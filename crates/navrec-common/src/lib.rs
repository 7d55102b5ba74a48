//! # Navrec Common
//!
//! Shared building blocks for the navrec command-line tools:
//!
//! - **protocol**: the RPC envelope (`Request`/`Response`) and the error
//!   taxonomy (`NavError`, `FailureKind`)
//! - **transport**: JSON codec and the synchronous length-prefixed TCP
//!   transport used to reach the robot's services
//! - **map**: the graph-nav data model (`Graph`, `Waypoint`, `Edge`, ...)
//! - **math**: SE(3) pose helpers for edge-transform computation
//!
//! Everything a robot service returns crosses the wire as JSON; raw byte
//! payloads (snapshots, images) are base64 strings inside the envelope
//! (see [`b64`]).

pub mod b64;
pub mod map;
pub mod math;
pub mod protocol;
pub mod transport;

pub use protocol::{FailureKind, NavError, Request, Response, Result};
