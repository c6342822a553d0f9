pub mod logging;
pub mod metrics;

pub use logging::init as init_logging;
pub use metrics::{BreakerState, Metrics, MetricsSnapshot};
