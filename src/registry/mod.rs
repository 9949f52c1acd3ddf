// src/registry/mod.rs
mod endpoint;

pub use endpoint::{Endpoint, EndpointRegistry};
