// Domain layer: diagnosis models and ports (interfaces). No HTTP or UI code here.

pub mod model;
pub mod ports;
