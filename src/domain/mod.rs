// Domain layer: record types, CAD/tool enums and the ports the pipeline is built on.

pub mod model;
pub mod ports;
