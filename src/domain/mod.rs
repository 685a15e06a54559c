// Domain layer: core models and ports (capability interfaces for the two external services).

pub mod model;
pub mod ports;
