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

//! # Navrec CLI
//!
//! Command-line tools for driving a robot's graph-nav subsystems:
//!
//! - `navrec record`: an interactive session for recording a map:
//!   creating waypoints and edges, closing loops, optimizing anchoring,
//!   and downloading the result to disk
//! - `navrec power`: a small power-cycling tutorial command
//!
//! The heavy lifting (topology construction, loop-closure and anchoring
//! solvers, localization) happens on the robot; this crate builds
//! requests, invokes the remote services through `navrec-client`, and
//! reports results.

pub mod command;
pub mod download;
pub mod graph_index;
pub mod power;
pub mod session;
