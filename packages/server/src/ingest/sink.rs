use async_trait::async_trait;
use tracing::debug;

use crate::models::input::AugmentedValue;

/// Receives every persisted value once the request has been accepted.
#[async_trait]
pub trait ValueSink: Send + Sync {
    async fn publish(&self, values: &[AugmentedValue]);
}

/// Logs accepted values at debug level.
pub struct LogSink;

#[async_trait]
impl ValueSink for LogSink {
    async fn publish(&self, values: &[AugmentedValue]) {
        for v in values {
            debug!(
                object_id = v.object_id,
                timestamp = %v.timestamp,
                value = %v.value,
                unit = %v.unit_symbol,
                "Value accepted"
            );
        }
    }
}
