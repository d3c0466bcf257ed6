//! Terminal rendering for people.

use owo_colors::OwoColorize as _;

use crate::domain::protocol::DispatchReport;
use crate::output::{OutputContext, ServerListing};

pub struct HumanRenderer<'a> {
    ctx: &'a OutputContext,
}

impl<'a> HumanRenderer<'a> {
    #[must_use]
    pub fn new(ctx: &'a OutputContext) -> Self {
        Self { ctx }
    }

    /// One line per server, then a summary.
    pub fn render_report(&self, report: &DispatchReport) {
        if report.outcomes.is_empty() {
            self.ctx.info("No servers configured.");
            return;
        }
        for outcome in &report.outcomes {
            let took = format!("({:.1}s)", outcome.elapsed.as_secs_f64());
            match &outcome.result {
                Ok(()) => self.ctx.success(&format!(
                    "{} [{}] shutdown issued {}",
                    outcome.server,
                    outcome.controller,
                    took.style(self.ctx.styles.dim)
                )),
                Err(f) => self.ctx.error(&format!(
                    "{} [{}] {} failure at {}: {}",
                    outcome.server, outcome.controller, f.kind, outcome.reached, f.detail
                )),
            }
            if !outcome.reachability.reachable {
                self.ctx.warn(&format!(
                    "{} did not answer {} ping(s)",
                    outcome.server, outcome.reachability.attempts
                ));
            }
        }
        let failed = report.failures().count();
        if failed == 0 {
            self.ctx
                .success(&format!("All {} server(s) shut down.", report.outcomes.len()));
        } else {
            self.ctx.error(&format!(
                "{failed} of {} server(s) failed.",
                report.outcomes.len()
            ));
        }
    }

    pub fn render_servers(&self, servers: &[ServerListing]) {
        if servers.is_empty() {
            self.ctx.info("No servers configured.");
            return;
        }
        self.ctx.header("Shutdown queue");
        for s in servers {
            self.ctx.kv(
                &format!("{:>3}", s.index),
                &format!(
                    "{:<19} {}:{}  user={}  file={}",
                    s.controller.tag(),
                    s.host,
                    s.port,
                    s.user,
                    s.password_file
                ),
            );
        }
    }
}
