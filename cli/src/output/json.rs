//! JSON output helpers.

use anyhow::{Context, Result};
use serde::{Serialize, Serializer};
use serde_json::json;

use crate::domain::protocol::{DispatchReport, ShutdownOutcome};
use crate::domain::server::ControllerKind;
use crate::output::ServerListing;

/// Format a JSON error object.
///
/// Output (pretty-printed):
/// ```json
/// {
///   "error": true,
///   "message": "...",
///   "code": "..."
/// }
/// ```
///
/// # Errors
///
/// Returns an error if JSON serialization fails.
pub fn format_error(message: &str, code: &str) -> Result<String> {
    let obj = json!({
        "error": true,
        "message": message,
        "code": code,
    });
    serde_json::to_string_pretty(&obj).context("JSON serialization failed")
}

pub struct JsonRenderer;

impl JsonRenderer {
    /// # Errors
    ///
    /// Returns an error if JSON serialization fails.
    pub fn version(version: &str) -> Result<String> {
        serde_json::to_string(&json!({ "version": version })).context("JSON serialization failed")
    }

    /// # Errors
    ///
    /// Returns an error if JSON serialization fails.
    pub fn report(report: &DispatchReport) -> Result<String> {
        let doc = ReportJson {
            success: report.all_succeeded(),
            outcomes: report.outcomes.iter().map(OutcomeJson::from).collect(),
        };
        serde_json::to_string_pretty(&doc).context("JSON serialization failed")
    }

    /// # Errors
    ///
    /// Returns an error if JSON serialization fails.
    pub fn servers(servers: &[ServerListing]) -> Result<String> {
        serde_json::to_string_pretty(&ServersJson { servers })
            .context("JSON serialization failed")
    }
}

/// Serialize a controller kind as its canonical settings tag.
///
/// # Errors
///
/// Propagates the serializer's error.
pub fn controller_tag<S: Serializer>(kind: &ControllerKind, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(kind.tag())
}

#[derive(Serialize)]
struct ServersJson<'a> {
    servers: &'a [ServerListing],
}

#[derive(Serialize)]
struct ReportJson<'a> {
    success: bool,
    outcomes: Vec<OutcomeJson<'a>>,
}

#[derive(Serialize)]
struct OutcomeJson<'a> {
    server: &'a str,
    controller: &'static str,
    success: bool,
    failure_kind: Option<String>,
    detail: String,
    reached: String,
    elapsed_ms: u64,
    reachability: ReachabilityJson<'a>,
}

#[derive(Serialize)]
struct ReachabilityJson<'a> {
    reachable: bool,
    attempts: u32,
    address: Option<&'a str>,
    round_trip_ms: Option<f64>,
    ttl: Option<u32>,
}

impl<'a> From<&'a ShutdownOutcome> for OutcomeJson<'a> {
    fn from(o: &'a ShutdownOutcome) -> Self {
        let reply = o.reachability.last_reply.as_ref();
        Self {
            server: &o.server,
            controller: o.controller.tag(),
            success: o.is_success(),
            failure_kind: o.result.as_ref().err().map(|f| f.kind.to_string()),
            detail: o.detail(),
            reached: o.reached.to_string(),
            elapsed_ms: u64::try_from(o.elapsed.as_millis()).unwrap_or(u64::MAX),
            reachability: ReachabilityJson {
                reachable: o.reachability.reachable,
                attempts: o.reachability.attempts,
                address: reply.and_then(|r| r.address.as_deref()),
                round_trip_ms: reply.and_then(|r| r.round_trip_ms),
                ttl: reply.and_then(|r| r.ttl),
            },
        }
    }
}
