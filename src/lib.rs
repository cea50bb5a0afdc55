//! Readiness-gate test services
//!
//! Two cooperating processes built from this library:
//! - the gated app (`readygate-app`), which refuses requests until a startup
//!   delay has elapsed
//! - the prober (`readygate-prober`), which polls the app on every request and
//!   reports the aggregate result as a status code

pub mod clock;
pub mod config;
pub mod gate;
pub mod probe;
pub mod server;
