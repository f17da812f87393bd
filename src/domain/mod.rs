// Domain layer: value types and ports (interfaces). No threading or IO here.

pub mod model;
pub mod ports;
