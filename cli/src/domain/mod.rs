//! Domain layer: pure business logic, types, and validation.
//!
//! This module has zero imports from `crate::infra`, `crate::commands`,
//! `crate::application`, `tokio`, `std::fs`, `std::process`, or `std::net`.
//! All functions are synchronous and take data in, returning data out.

pub mod cookie;
pub mod envelope;
pub mod error;
pub mod form;
pub mod protocol;
pub mod server;
pub mod settings;
pub mod trust;

pub use cookie::{SessionCookie, parse_set_cookie};
pub use envelope::{Envelope, EnvelopeTemplate};
pub use error::{
    ConfigError, CredentialError, DispatchError, ShutdownError, TemplateError, TransportError,
};
pub use protocol::{
    ControllerState, DispatchReport, FailureKind, HttpRequest, ProtocolStep, ReachabilityReport,
    RequestMethod, ShutdownEvent, ShutdownFailure, ShutdownOutcome, build_request,
};
pub use server::{ControllerKind, ServerAdminRecord};
pub use settings::{RawSettings, ReachabilityPolicy, Settings, Synchronicity, TlsSettings};
