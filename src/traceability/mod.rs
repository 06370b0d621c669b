//! Traffic telemetry for discovered APIs
//!
//! Analytics events become transaction summaries and legs; monitoring
//! buckets become metric events. Both advance watermarks kept on disk.

pub mod agent;
pub mod emitter;
pub mod mapper;
pub mod processor;
pub mod watermark;

pub use agent::{EventsJob, MetricsJob, TraceabilityAgent};
pub use emitter::{MetricBatcher, MetricEmitter, MetricMessage, MetricSource};
pub use mapper::EventMapper;
pub use processor::EventProcessor;
pub use watermark::Watermarks;
