//! Domain layer: models, schemas, ports and errors.

pub mod errors;
pub mod models;
pub mod ports;
