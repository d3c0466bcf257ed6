//! Protocol steps, outbound request descriptors, and per-server outcomes.

use std::fmt;
use std::time::Duration;

use crate::domain::cookie::SessionCookie;
use crate::domain::server::ControllerKind;

// ── Requests ─────────────────────────────────────────────────────────────────

pub const USER_AGENT: &str = concat!("poweroff-guests/", env!("CARGO_PKG_VERSION"));
pub const ACCEPT: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8";
pub const ACCEPT_LANGUAGE: &str = "en-us,en;q=0.5";
pub const ACCEPT_ENCODING: &str = "identity";
pub const ACCEPT_CHARSET: &str = "ISO-8859-1,utf-8;q=0.7,*;q=0.7";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestMethod {
    Get,
    Post,
}

impl fmt::Display for RequestMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Get => "GET",
            Self::Post => "POST",
        })
    }
}

/// A fully-formed outbound request, minus the body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub method: RequestMethod,
    pub url: String,
    pub headers: Vec<(String, String)>,
}

impl HttpRequest {
    /// First header value with the given name, compared case-insensitively.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Build a request carrying the fixed identification and accept headers.
///
/// `headers` are applied after the defaults and replace any default of the
/// same name. The cookie, when present, is sent as `name=value`.
#[must_use]
pub fn build_request(
    url: &str,
    method: RequestMethod,
    content_type: Option<&str>,
    headers: &[(&str, String)],
    referer: Option<&str>,
    cookie: Option<&SessionCookie>,
) -> HttpRequest {
    let mut all: Vec<(String, String)> = vec![
        ("User-Agent".into(), USER_AGENT.into()),
        ("Accept".into(), ACCEPT.into()),
        ("Accept-Language".into(), ACCEPT_LANGUAGE.into()),
        ("Accept-Encoding".into(), ACCEPT_ENCODING.into()),
        ("Accept-Charset".into(), ACCEPT_CHARSET.into()),
    ];
    if let Some(ct) = content_type {
        all.push(("Content-Type".into(), ct.into()));
    }
    for (name, value) in headers {
        all.retain(|(k, _)| !k.eq_ignore_ascii_case(name));
        all.push(((*name).to_string(), value.clone()));
    }
    if let Some(r) = referer {
        all.push(("Referer".into(), r.into()));
    }
    if let Some(c) = cookie {
        all.push(("Cookie".into(), c.header_value()));
    }
    HttpRequest {
        method,
        url: url.to_string(),
        headers: all,
    }
}

// ── Controller state machine ─────────────────────────────────────────────────

/// How far one shutdown attempt got.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ControllerState {
    Idle,
    Greeted,
    Authenticated,
    ShutdownIssued,
}

impl fmt::Display for ControllerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Idle => "idle",
            Self::Greeted => "greeted",
            Self::Authenticated => "authenticated",
            Self::ShutdownIssued => "shutdown issued",
        })
    }
}

// ── Protocol steps ───────────────────────────────────────────────────────────

/// Payload template of a step. Filled per invocation, never mutated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepBody {
    None,
    /// SOAP envelope from a header fragment and a body fragment.
    Envelope {
        header: String,
        body: &'static str,
    },
    /// SOAP login envelope; username and decrypted password are spliced in.
    LoginEnvelope {
        header: String,
        body: &'static str,
    },
    /// `username=...&password=...` form login.
    FormLogin,
}

/// One request/response exchange of a vendor protocol.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProtocolStep {
    pub name: &'static str,
    pub path: &'static str,
    pub method: RequestMethod,
    pub content_type: Option<&'static str>,
    pub headers: Vec<(&'static str, String)>,
    pub referer_path: Option<&'static str>,
    pub body: StepBody,
    /// The response must yield the session cookie used by later steps.
    pub captures_cookie: bool,
    /// State reached once this step's response is processed.
    pub reaches: ControllerState,
}

// ── Reachability ─────────────────────────────────────────────────────────────

/// One ping reply as reported by the probe.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PingReply {
    pub success: bool,
    pub address: Option<String>,
    pub round_trip_ms: Option<f64>,
    pub ttl: Option<u32>,
    pub bytes: Option<u32>,
    pub dont_fragment: Option<bool>,
}

/// Result of the bounded-retry precheck that precedes every attempt.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReachabilityReport {
    pub reachable: bool,
    pub attempts: u32,
    pub last_reply: Option<PingReply>,
}

impl ReachabilityReport {
    /// Multi-line diagnostic summary for the log.
    #[must_use]
    pub fn describe(&self, server: &str) -> String {
        const NA: &str = "not available";
        let reply = self.last_reply.clone().unwrap_or_default();
        let opt = |v: Option<String>| v.unwrap_or_else(|| NA.to_string());
        format!(
            "Reply status for server {server} was {status} after {attempts} attempt(s).\n\
             Address: {address}.\n\
             RoundTrip time: {rtt}.\n\
             Time to live: {ttl}.\n\
             Don't fragment: {df}.\n\
             Buffer size: {bytes}.",
            status = if self.reachable { "Success" } else { "Failure" },
            attempts = self.attempts,
            address = opt(reply.address),
            rtt = opt(reply.round_trip_ms.map(|ms| format!("{ms} ms"))),
            ttl = opt(reply.ttl.map(|t| t.to_string())),
            df = opt(reply.dont_fragment.map(|d| d.to_string())),
            bytes = opt(reply.bytes.map(|b| b.to_string())),
        )
    }
}

// ── Outcomes ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    Credential,
    Transport,
    Template,
    Unreachable,
    Incomplete,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Credential => "credential",
            Self::Transport => "transport",
            Self::Template => "template",
            Self::Unreachable => "unreachable",
            Self::Incomplete => "incomplete",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShutdownFailure {
    pub kind: FailureKind,
    pub detail: String,
}

/// Per-server result of one controller run.
#[derive(Debug, Clone)]
pub struct ShutdownOutcome {
    pub server: String,
    pub controller: ControllerKind,
    pub reachability: ReachabilityReport,
    pub reached: ControllerState,
    pub result: Result<(), ShutdownFailure>,
    pub elapsed: Duration,
}

impl ShutdownOutcome {
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }

    #[must_use]
    pub fn detail(&self) -> String {
        match &self.result {
            Ok(()) => format!("{}.Shutdown on server {} has been executed", self.controller, self.server),
            Err(f) => f.detail.clone(),
        }
    }
}

/// Outcomes of one dispatch, in queue order.
#[derive(Debug, Clone, Default)]
pub struct DispatchReport {
    pub outcomes: Vec<ShutdownOutcome>,
}

impl DispatchReport {
    pub fn failures(&self) -> impl Iterator<Item = &ShutdownOutcome> {
        self.outcomes.iter().filter(|o| !o.is_success())
    }

    #[must_use]
    pub fn all_succeeded(&self) -> bool {
        self.failures().next().is_none()
    }

    /// One combined message for every failed server, or `None`.
    #[must_use]
    pub fn combined_failure(&self) -> Option<String> {
        let lines: Vec<String> = self
            .failures()
            .map(|o| format!("{}: {}", o.server, o.detail()))
            .collect();
        if lines.is_empty() {
            None
        } else {
            Some(format!(
                "{} of {} server(s) failed to shut down:\n{}",
                lines.len(),
                self.outcomes.len(),
                lines.join("\n")
            ))
        }
    }
}

// ── Events ───────────────────────────────────────────────────────────────────

/// Notifications a controller emits while it runs.
#[derive(Debug, Clone)]
pub enum ShutdownEvent {
    PrecheckStarted { server: String },
    PingAttempt { server: String, attempt: u32, of: u32 },
    PingError { server: String, error: String },
    Reachability { server: String, report: ReachabilityReport },
    StepSending { server: String, step: &'static str },
    StepCompleted { server: String, step: &'static str, state: ControllerState },
    /// A value scraped from a reply; only its length is reported.
    ArtifactRetrieved { server: String, artifact: &'static str, len: usize },
    ShutdownExecuted { server: String, controller: ControllerKind },
    Failed { server: String, kind: FailureKind, detail: String },
}
