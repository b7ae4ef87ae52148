// Process-level concerns: tracing setup and the HTTP server

pub mod logging;
pub mod server;
