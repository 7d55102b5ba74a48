//! Waypoint and edge lookup over a downloaded graph.
//!
//! Waypoints can be referred to by full id, by a two-character short
//! code derived from the id, or by annotation name. The index is rebuilt
//! from each fresh graph snapshot so references always resolve against
//! the latest topology.

use std::collections::HashMap;

use navrec_common::map::{Graph, Waypoint};
use navrec_common::protocol::{NavError, Result};

/// Lookup maps derived from one graph snapshot.
#[derive(Debug, Default)]
pub struct GraphIndex {
    /// Annotation name -> waypoint id; `None` when the name is shared by
    /// several waypoints and cannot identify one.
    name_to_id: HashMap<String, Option<String>>,
    /// to-waypoint id -> ids of waypoints with an edge into it.
    edges_to_from: HashMap<String, Vec<String>>,
}

impl GraphIndex {
    pub fn build(graph: &Graph) -> Self {
        let mut name_to_id: HashMap<String, Option<String>> = HashMap::new();
        for waypoint in &graph.waypoints {
            if waypoint.name.is_empty() {
                continue;
            }
            name_to_id
                .entry(waypoint.name.clone())
                .and_modify(|existing| *existing = None)
                .or_insert_with(|| Some(waypoint.id.clone()));
        }

        let mut edges_to_from: HashMap<String, Vec<String>> = HashMap::new();
        for edge in &graph.edges {
            edges_to_from
                .entry(edge.id.to_waypoint.clone())
                .or_default()
                .push(edge.id.from_waypoint.clone());
        }

        Self {
            name_to_id,
            edges_to_from,
        }
    }

    /// Two-character short code for a waypoint id: the first letters of
    /// the first two dash-separated tokens. Ids with fewer than three
    /// tokens have no short code.
    pub fn short_code(id: &str) -> Option<String> {
        let tokens: Vec<&str> = id.split('-').collect();
        if tokens.len() > 2 {
            let mut code = String::new();
            code.push(tokens[0].chars().next()?);
            code.push(tokens[1].chars().next()?);
            Some(code)
        } else {
            None
        }
    }

    /// Resolves a user-supplied waypoint reference to a full id.
    ///
    /// Tries, in order: unique short-code match, exact id, unique
    /// annotation name. Anything else is a definite input error, either
    /// an ambiguous reference or a not-found, never a pass-through.
    pub fn resolve(&self, graph: &Graph, reference: &str) -> Result<String> {
        if reference.len() == 2 {
            let mut matches = graph
                .waypoints
                .iter()
                .filter(|w| Self::short_code(&w.id).as_deref() == Some(reference));
            if let Some(first) = matches.next() {
                if matches.next().is_some() {
                    return Err(NavError::AmbiguousWaypoint(format!(
                        "short code '{}' matches more than one waypoint",
                        reference
                    )));
                }
                return Ok(first.id.clone());
            }
        }

        if graph.waypoint_by_id(reference).is_some() {
            return Ok(reference.to_string());
        }

        match self.name_to_id.get(reference) {
            Some(Some(id)) => Ok(id.clone()),
            Some(None) => Err(NavError::AmbiguousWaypoint(format!(
                "annotation name '{}' is shared by more than one waypoint",
                reference
            ))),
            None => Err(NavError::WaypointNotFound(reference.to_string())),
        }
    }

    /// Waypoints with an edge into `to_id`.
    pub fn edges_into(&self, to_id: &str) -> &[String] {
        self.edges_to_from
            .get(to_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Waypoints in creation order (ties broken by id for stability).
    pub fn sorted_chrono(graph: &Graph) -> Vec<&Waypoint> {
        let mut waypoints: Vec<&Waypoint> = graph.waypoints.iter().collect();
        waypoints.sort_by(|a, b| {
            a.created_at_secs
                .partial_cmp(&b.created_at_secs)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.id.cmp(&b.id))
        });
        waypoints
    }

    /// Prints the waypoints (chronologically, with short codes) and the
    /// edges of the graph. The waypoint the robot is localized to is
    /// marked with an arrow.
    pub fn print_listing(&self, graph: &Graph, localized_id: &str) {
        println!(
            "{} waypoints and {} edges on the robot:",
            graph.waypoints.len(),
            graph.edges.len()
        );
        for waypoint in Self::sorted_chrono(graph) {
            let marker = if waypoint.id == localized_id { "->" } else { "  " };
            let code = Self::short_code(&waypoint.id).unwrap_or_else(|| "  ".to_string());
            println!(
                "{} Waypoint name: {} id: {} short code: {}",
                marker, waypoint.name, waypoint.id, code
            );
        }
        for edge in &graph.edges {
            println!(
                "   (Edge) from waypoint {} to waypoint {}",
                edge.id.from_waypoint, edge.id.to_waypoint
            );
        }
    }
}
