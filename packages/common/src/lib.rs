pub mod dates;
pub mod duration;
pub mod granularity;
pub mod months;
pub mod value_type;

pub use dates::{DateConfig, DateError};
pub use duration::DurationError;
pub use granularity::{Granularity, GranularityError};
pub use value_type::{ValueError, ValueType};
