use std::sync::Arc;

use chrono::{DateTime, Utc};
use sea_orm::DbErr;
use tokio::sync::{Mutex, mpsc};
use tracing::{error, warn};

use super::StatsEngine;

/// A statistics update waiting to be applied.
#[derive(Debug, Clone)]
pub enum StatsTask {
    Writes(Vec<(i64, DateTime<Utc>)>),
    Read(i64),
}

impl StatsTask {
    fn name(&self) -> &'static str {
        match self {
            StatsTask::Writes(_) => "record_write_batch",
            StatsTask::Read(_) => "record_read",
        }
    }

    /// The first two arguments, for logging.
    fn args(&self) -> (String, String) {
        match self {
            StatsTask::Writes(values) => (
                values.first().map(|(id, _)| id.to_string()).unwrap_or_default(),
                values
                    .first()
                    .map(|(_, ts)| ts.to_rfc3339())
                    .unwrap_or_default(),
            ),
            StatsTask::Read(id) => (id.to_string(), String::new()),
        }
    }

    async fn run(self, engine: &dyn StatsEngine) -> Result<(), DbErr> {
        match self {
            StatsTask::Writes(values) => engine.record_write_batch(&values).await,
            StatsTask::Read(object_id) => engine.record_read(object_id).await,
        }
    }
}

/// Routes statistics updates to the engine, inline or through a worker pool.
///
/// In pooled mode a full queue makes the caller run the task itself.
#[derive(Clone)]
pub struct StatsDispatcher {
    engine: Arc<dyn StatsEngine>,
    queue: Option<mpsc::Sender<StatsTask>>,
}

impl StatsDispatcher {
    /// Every task runs on the submitting request and its errors are returned.
    pub fn inline(engine: Arc<dyn StatsEngine>) -> Self {
        Self { engine, queue: None }
    }

    /// Spawn `pool_size` workers draining a queue of `capacity` tasks.
    pub fn pooled(engine: Arc<dyn StatsEngine>, pool_size: usize, capacity: usize) -> Self {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let rx = Arc::new(Mutex::new(rx));
        for worker in 0..pool_size.max(1) {
            let rx = Arc::clone(&rx);
            let engine = Arc::clone(&engine);
            tokio::spawn(async move {
                loop {
                    let task = { rx.lock().await.recv().await };
                    let Some(task) = task else {
                        break;
                    };
                    run_logged(engine.as_ref(), task).await;
                }
                tracing::debug!(worker, "Stats worker stopped");
            });
        }
        Self {
            engine,
            queue: Some(tx),
        }
    }

    pub fn engine(&self) -> &Arc<dyn StatsEngine> {
        &self.engine
    }

    pub async fn submit(&self, task: StatsTask) -> Result<(), DbErr> {
        let Some(queue) = &self.queue else {
            return task.run(self.engine.as_ref()).await;
        };
        match queue.try_send(task) {
            Ok(()) => Ok(()),
            Err(mpsc::error::TrySendError::Full(task)) => {
                warn!(task = task.name(), "Stats queue full, running on caller");
                run_logged(self.engine.as_ref(), task).await;
                Ok(())
            }
            Err(mpsc::error::TrySendError::Closed(task)) => {
                run_logged(self.engine.as_ref(), task).await;
                Ok(())
            }
        }
    }
}

async fn run_logged(engine: &dyn StatsEngine, task: StatsTask) {
    let name = task.name();
    let (arg0, arg1) = task.args();
    if let Err(e) = task.run(engine).await {
        error!(task = name, arg0 = %arg0, arg1 = %arg1, error = %e, "Stats update failed");
    }
}
