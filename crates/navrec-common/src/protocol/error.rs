use thiserror::Error;

/// How the dispatcher should react to a failure.
///
/// The command loop routes on this instead of matching error variants
/// everywhere: `Transient` failures may be retried on a fixed delay,
/// `Input` failures are reported and the loop continues with no state
/// change, `Fatal` failures are reported at the command boundary (or, at
/// startup, abort the process).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// A service-not-ready condition that is expected to clear on its own.
    Transient,
    /// Malformed user input: wrong argument count, unknown command,
    /// unresolvable waypoint reference.
    Input,
    /// Everything else: transport, serialization, authentication,
    /// permission, and generic service failures.
    Fatal,
}

#[derive(Error, Debug)]
pub enum NavError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("connection error: {0}")]
    Connection(String),

    #[error("request timeout after {0}ms")]
    Timeout(u64),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("invalid response: {0}")]
    InvalidResponse(String),

    #[error("service error: {0}")]
    Service(String),

    #[error("authentication failed: {0}")]
    Unauthenticated(String),

    #[error("permission denied: {0}")]
    PermissionDenied(String),

    #[error("lease error: {0}")]
    LeaseUse(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// The recording service is still finishing background processing.
    #[error("recording is not ready to stop yet")]
    NotReadyYet,

    #[error("waypoint not found: {0}")]
    WaypointNotFound(String),

    #[error("ambiguous waypoint reference: {0}")]
    AmbiguousWaypoint(String),

    #[error("invalid arguments: {0}")]
    InvalidArguments(String),
}

impl NavError {
    /// Classifies this error for the dispatcher.
    pub fn kind(&self) -> FailureKind {
        match self {
            NavError::NotReadyYet => FailureKind::Transient,
            NavError::WaypointNotFound(_)
            | NavError::AmbiguousWaypoint(_)
            | NavError::InvalidArguments(_) => FailureKind::Input,
            _ => FailureKind::Fatal,
        }
    }

    /// Convenience predicate for retry loops.
    pub fn is_transient(&self) -> bool {
        self.kind() == FailureKind::Transient
    }
}

pub type Result<T> = std::result::Result<T, NavError>;
