// Domain layer: closure records and the ports the engine talks to storage, mail and time through.

pub mod model;
pub mod ports;
