//! HTTP API: routing, request parsing and response mapping over the warehouse services.

pub mod app;
