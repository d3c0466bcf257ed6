//! Reachability probe backed by the system `ping` tool.
//!
//! Raw ICMP sockets need elevated privileges; the setuid `ping` binary does
//! not. One invocation sends exactly one echo request.

use std::sync::LazyLock;

use anyhow::Result;
use regex::Regex;

use crate::application::ports::{CommandRunner, ReachabilityProbe};
use crate::domain::protocol::PingReply;

/// Seconds `ping` waits for the reply.
pub const PING_WAIT_SECS: u32 = 2;

#[allow(clippy::expect_used)] // Pattern is a compile-time constant
static REPLY_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^(\d+) bytes from (?:\S+ \()?([^\s:()]+)\)?:.*$").expect("valid reply pattern")
});

#[allow(clippy::expect_used)] // Pattern is a compile-time constant
static TTL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)ttl=(\d+)").expect("valid ttl pattern"));

#[allow(clippy::expect_used)] // Pattern is a compile-time constant
static TIME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"time[=<]([\d.]+)\s*ms").expect("valid time pattern"));

pub struct PingProbe<R> {
    runner: R,
}

impl<R: CommandRunner> PingProbe<R> {
    #[must_use]
    pub fn new(runner: R) -> Self {
        Self { runner }
    }
}

impl<R: CommandRunner> ReachabilityProbe for PingProbe<R> {
    async fn ping_once(&self, host: &str) -> Result<PingReply> {
        let wait = wait_arg();
        let output = self
            .runner
            .run("ping", &["-c", "1", "-W", &wait, host])
            .await?;
        let stdout = String::from_utf8_lossy(&output.stdout);
        let mut reply = parse_ping_output(&stdout);
        reply.success &= output.status.success();
        Ok(reply)
    }
}

#[cfg(target_os = "macos")]
fn wait_arg() -> String {
    (PING_WAIT_SECS * 1000).to_string()
}

#[cfg(not(target_os = "macos"))]
fn wait_arg() -> String {
    PING_WAIT_SECS.to_string()
}

/// Extract the reply diagnostics from `ping` output.
///
/// The tool does not report the don't-fragment flag, so it stays `None`.
#[must_use]
pub fn parse_ping_output(stdout: &str) -> PingReply {
    let Some(line) = REPLY_LINE.captures(stdout) else {
        return PingReply::default();
    };
    let text = line.get(0).map_or("", |m| m.as_str());
    PingReply {
        success: true,
        bytes: line.get(1).and_then(|m| m.as_str().parse().ok()),
        address: line.get(2).map(|m| m.as_str().to_string()),
        ttl: TTL
            .captures(text)
            .and_then(|c| c.get(1))
            .and_then(|m| m.as_str().parse().ok()),
        round_trip_ms: TIME
            .captures(text)
            .and_then(|c| c.get(1))
            .and_then(|m| m.as_str().parse().ok()),
        dont_fragment: None,
    }
}
