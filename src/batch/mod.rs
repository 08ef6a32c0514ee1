//! Library-scale batch analysis
//!
//! Cache hits are resolved synchronously and delivered first, in input
//! order. Misses run on a small fixed worker pool and are delivered in
//! completion order.

pub mod coordinator;

pub use coordinator::{
    BatchCoordinator, BatchEvent, BatchStream, CancellationToken, Partition, ResultSource,
};
