pub mod config;
pub mod math;
pub mod metrics;
pub mod model;
pub mod ports;

pub use config::*;
pub use math::*;
pub use metrics::*;
pub use model::*;
pub use ports::*;
