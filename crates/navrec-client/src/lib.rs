//! # Navrec Client
//!
//! Typed clients for the remote services the navrec tools drive. Each
//! client is a thin wrapper over an [`RpcChannel`]: it builds the request
//! payload, invokes the remote method, and parses the typed response.
//!
//! The concrete [`TcpChannel`] opens a fresh connection per request and
//! injects the session token obtained from `robot.authenticate`; tests
//! substitute scripted fakes behind the same trait.

pub mod channel;
pub mod graph_nav;
pub mod image;
pub mod map_processing;
pub mod power;
pub mod recording;

pub use channel::{RpcChannel, TcpChannel};
pub use graph_nav::GraphNavClient;
pub use image::{ImageCapture, ImageClient, PixelFormat};
pub use map_processing::{MapProcessingClient, ProcessAnchoringResponse, ProcessTopologyResponse};
pub use power::{PowerClient, PowerCommandResponse, PowerRequest, PowerStatus};
pub use recording::{RecordingClient, RecordingStatus, SessionMetadata};
