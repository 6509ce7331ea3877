//! # Edge Processing Layer
//!
//! Local pipeline between the device and the sync engine: noise filtering,
//! priority queuing, and compression estimation. Reduces bandwidth and
//! saves energy on the constrained device before anything hits the radio.

pub mod compressor;
pub mod filter;
pub mod processor;
pub mod queue;

pub use compressor::{CompressorStats, DataCompressor};
pub use filter::DataFilter;
pub use processor::{EdgeProcessor, EdgeStats, ProcessedReading};
pub use queue::{Priority, PriorityDataQueue, QueueStats};
