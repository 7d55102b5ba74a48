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

//! # Navrec CLI Entry Point
//!
//! Main binary for the navrec robot tools.
//!
//! ## Usage
//!
//! ```bash
//! # Record a map interactively, downloading to ./maps
//! navrec record 10.0.0.3 --username operator --password secret -d ./maps
//!
//! # Name the session and the recording user explicitly
//! navrec record 10.0.0.3 --username operator --password secret \
//!     -d ./maps -s hallway-run -n field-team
//!
//! # Cycle motor power
//! navrec power 10.0.0.3 --username operator --password secret --request cycle
//! ```
//!
//! The password may also come from the `NAVREC_PASSWORD` environment
//! variable, keeping it out of shell history.

use std::path::Path;

use anyhow::Result;
use argh::FromArgs;
use navrec_client::{PowerRequest, SessionMetadata, TcpChannel};
use navrec_cli::{power, session::RecordingSession};

/// Main CLI structure parsed from command-line arguments.
#[derive(FromArgs)]
/// navrec - command-line tools for the robot's graph-nav subsystems
struct Cli {
    #[argh(subcommand)]
    command: Commands,
}

#[derive(FromArgs)]
#[argh(subcommand)]
enum Commands {
    Record(RecordArgs),
    Power(PowerArgs),
}

/// Arguments for the interactive map-recording session.
#[derive(FromArgs)]
#[argh(subcommand, name = "record")]
/// record a graph-nav map interactively
struct RecordArgs {
    /// hostname or address of the robot
    #[argh(positional)]
    hostname: String,

    /// username to authenticate with
    #[argh(option, long = "username")]
    username: String,

    /// password to authenticate with
    ///
    /// Falls back to the NAVREC_PASSWORD environment variable when not
    /// given on the command line.
    #[argh(option, long = "password")]
    password: Option<String>,

    /// full filepath for where to download the graph and snapshots
    ///
    /// Defaults to the current directory.
    #[argh(option, short = 'd', long = "download-filepath", default = "\".\".into()")]
    download_filepath: String,

    /// special user name to attach to this recording session
    ///
    /// If not provided, the authenticated username is used.
    #[argh(option, short = 'n', long = "recording-user-name", default = "String::new()")]
    recording_user_name: String,

    /// special name for this recording session
    ///
    /// If not provided, the base name of the download filepath is used.
    #[argh(option, short = 's', long = "recording-session-name", default = "String::new()")]
    recording_session_name: String,
}

/// Arguments for the power tutorial command.
#[derive(FromArgs)]
#[argh(subcommand, name = "power")]
/// issue a motor power command and poll its feedback
struct PowerArgs {
    /// hostname or address of the robot
    #[argh(positional)]
    hostname: String,

    /// username to authenticate with
    #[argh(option, long = "username")]
    username: String,

    /// password to authenticate with
    ///
    /// Falls back to the NAVREC_PASSWORD environment variable when not
    /// given on the command line.
    #[argh(option, long = "password")]
    password: Option<String>,

    /// power request to issue: cycle, on, or off
    #[argh(option, long = "request", default = "PowerRequest::Cycle", from_str_fn(parse_power_request))]
    request: PowerRequest,
}

fn parse_power_request(value: &str) -> Result<PowerRequest, String> {
    value.parse()
}

/// Resolves the password from the flag or the environment. A missing
/// password is a startup failure, not a prompt.
fn resolve_password(flag: Option<String>) -> anyhow::Result<String> {
    flag.or_else(|| std::env::var("NAVREC_PASSWORD").ok())
        .ok_or_else(|| {
            anyhow::anyhow!("no password given; use --password or set NAVREC_PASSWORD")
        })
}

/// Authentication failures propagate: a session that cannot
/// authenticate exits non-zero.
fn authenticated_channel(
    hostname: &str,
    username: &str,
    password: Option<String>,
) -> anyhow::Result<TcpChannel> {
    let password = resolve_password(password)?;
    let mut channel = TcpChannel::new(hostname);
    channel.authenticate(username, &password)?;
    Ok(channel)
}

/// Session name defaults to the base name of the download path;
/// recording user defaults to the authenticated username.
fn resolve_metadata(args: &RecordArgs) -> SessionMetadata {
    let session_name = if args.recording_session_name.is_empty() {
        Path::new(&args.download_filepath)
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| args.download_filepath.clone())
    } else {
        args.recording_session_name.clone()
    };
    let user_name = if args.recording_user_name.is_empty() {
        args.username.clone()
    } else {
        args.recording_user_name.clone()
    };
    SessionMetadata::new(session_name, user_name)
}

fn main() -> Result<()> {
    let cli: Cli = argh::from_env();

    // Set default log level to INFO, but allow RUST_LOG env var to override
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Record(args) => {
            let channel = authenticated_channel(&args.hostname, &args.username, args.password.clone())?;
            let metadata = resolve_metadata(&args);
            tracing::info!(
                session = %metadata.session_name,
                user = %metadata.client_username,
                download = %args.download_filepath,
                "starting recording session"
            );

            let mut session =
                RecordingSession::new(channel, metadata, &args.download_filepath);
            let stdin = std::io::stdin();
            session.run(stdin.lock())?;
            Ok(())
        }
        Commands::Power(args) => {
            let channel = authenticated_channel(&args.hostname, &args.username, args.password.clone())?;
            power::run(channel, args.request)?;
            Ok(())
        }
    }
}
