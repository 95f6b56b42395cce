// Domain layer: core models, query descriptors and ports. No I/O here.

pub mod model;
pub mod ports;
pub mod query;
