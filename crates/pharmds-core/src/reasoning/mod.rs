//! Aggregation and explanation: hit list → ordered pair reports → prose.

mod combine;
mod explain;

pub use combine::*;
pub use explain::*;
