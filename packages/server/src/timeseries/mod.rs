//! Month-partitioned retrieval of raw values and aggregations, streamed as
//! JSON or CSV.

pub mod format;
pub mod query;
pub mod stream;

pub use format::Format;
pub use stream::{Series, stream_values};
