//! Session command parsing.
//!
//! Each input line is a single-character command code followed by
//! argument tokens. Parsing validates the arguments up front, so every
//! [`Command`] variant carries exactly what its handler needs.

use navrec_common::protocol::{NavError, Result};

/// Which loop-closure strategies to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopMode {
    All,
    FiducialOnly,
    OdometryOnly,
}

impl LoopMode {
    /// Parses a sub-choice token (`0` all, `1` fiducial, `2` odometry).
    pub fn parse(token: &str) -> Option<LoopMode> {
        match token {
            "0" => Some(LoopMode::All),
            "1" => Some(LoopMode::FiducialOnly),
            "2" => Some(LoopMode::OdometryOnly),
            _ => None,
        }
    }

    /// (fiducial, odometry) flags for the topology-processing request.
    pub fn flags(self) -> (bool, bool) {
        match self {
            LoopMode::All => (true, true),
            LoopMode::FiducialOnly => (true, false),
            LoopMode::OdometryOnly => (false, true),
        }
    }
}

/// A validated session command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    ClearMap,
    StartRecording,
    StopRecording,
    RecordStatus,
    CreateWaypoint { name: Option<String> },
    DownloadGraph,
    ListGraph,
    CreateEdge { from: String, to: String },
    CreateLoop,
    AutoCloseLoops { mode: Option<LoopMode> },
    OptimizeAnchoring,
    AddObject,
    Quit,
}

impl Command {
    /// Parses one input line. Blank lines are no commands at all;
    /// unknown codes and malformed arguments are input errors.
    pub fn parse(line: &str) -> Result<Option<Command>> {
        let mut tokens = line.split_whitespace();
        let Some(code) = tokens.next() else {
            return Ok(None);
        };
        let args: Vec<&str> = tokens.collect();

        let command = match code {
            "0" => Command::ClearMap,
            "1" => Command::StartRecording,
            "2" => Command::StopRecording,
            "3" => Command::RecordStatus,
            "4" => Command::CreateWaypoint {
                name: args.first().map(|s| s.to_string()),
            },
            "5" => Command::DownloadGraph,
            "6" => Command::ListGraph,
            "7" => {
                if args.len() != 2 {
                    return Err(NavError::InvalidArguments(
                        "specify the two waypoints to connect (short code or annotation)"
                            .to_string(),
                    ));
                }
                Command::CreateEdge {
                    from: args[0].to_string(),
                    to: args[1].to_string(),
                }
            }
            "8" => Command::CreateLoop,
            "9" => {
                let mode = match args.first() {
                    None => None,
                    Some(token) => Some(LoopMode::parse(token).ok_or_else(|| {
                        NavError::InvalidArguments(format!(
                            "unknown loop-closure option '{}' (0 all, 1 fiducial, 2 odometry)",
                            token
                        ))
                    })?),
                };
                Command::AutoCloseLoops { mode }
            }
            "a" => Command::OptimizeAnchoring,
            "o" => Command::AddObject,
            "q" => Command::Quit,
            other => {
                return Err(NavError::InvalidArguments(format!(
                    "request '{}' is not in the known command dictionary",
                    other
                )));
            }
        };
        Ok(Some(command))
    }
}
