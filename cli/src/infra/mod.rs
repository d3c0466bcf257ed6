//! Infrastructure layer: concrete implementations of application port traits.
//!
//! This module contains all I/O-performing code: process execution, the
//! settings file, credential encryption, TLS, HTTP, and logging.
//!
//! Imports from `crate::domain` and `crate::application::ports` are allowed.
//! Imports from `crate::commands` or `crate::output` are forbidden.

pub mod command_runner;
pub mod config;
pub mod credentials;
pub mod events;
pub mod logging;
pub mod ping;
pub mod tls;
pub mod transport;
