//! Command implementations

pub mod run;
pub mod servers;
pub mod set_password;
pub mod version;
