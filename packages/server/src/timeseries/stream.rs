use std::io;

use axum::{
    body::{Body, Bytes},
    http::{StatusCode, header},
    response::Response,
};
use chrono::{DateTime, Utc};
use sea_orm::*;
use tokio::sync::mpsc;
use tracing::{debug, error, instrument};

use super::format::{AGGREGATION_CSV_HEADER, Format, RAW_CSV_HEADER, Row};
use super::query;
use crate::entity::{object, unit};
use crate::error::AppError;
use crate::models::unit::UnitResponse;
use crate::utils::access::Access;

/// Buffered bytes are handed to the body once they reach this size.
const CHUNK_SIZE: usize = 16 * 1024;
const CHANNEL_DEPTH: usize = 8;

/// Which series to read for every object of a request.
#[derive(Debug, Clone, Copy)]
pub enum Series {
    Raw {
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    },
    Latest {
        before: DateTime<Utc>,
        depth: usize,
    },
    Aggregated {
        minutes: i32,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    },
}

impl Series {
    fn csv_header(&self) -> &'static str {
        match self {
            Series::Raw { .. } | Series::Latest { .. } => RAW_CSV_HEADER,
            Series::Aggregated { .. } => AGGREGATION_CSV_HEADER,
        }
    }
}

/// Stream the values of `ids` as they are read, one partition at a time.
///
/// Objects the caller cannot read are reported inline in JSON and skipped in
/// CSV. A storage failure aborts the body, leaving the client with a
/// truncated response. The scan stops as soon as the client goes away.
pub fn stream_values(
    db: DatabaseConnection,
    access: Access,
    ids: Vec<i64>,
    series: Series,
    format: Format,
) -> Result<Response, AppError> {
    let (tx, rx) = mpsc::channel::<Result<Bytes, io::Error>>(CHANNEL_DEPTH);

    tokio::spawn(async move {
        let mut out = ChunkWriter::new(tx);
        if let Err(e) = write_all(&db, &access, &ids, series, format, &mut out).await {
            error!(error = %e, "Values stream aborted");
            out.abort(e).await;
            return;
        }
        out.finish().await;
    });

    let body = Body::from_stream(futures::stream::unfold(rx, |mut rx| async move {
        rx.recv().await.map(|item| (item, rx))
    }));

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, format.content_type())
        .body(body)
        .map_err(|e| AppError::Internal(format!("Failed to build response: {e}")))
}

#[instrument(skip(db, access, ids, out), fields(user_id = access.user_id, objects = ids.len()))]
async fn write_all(
    db: &DatabaseConnection,
    access: &Access,
    ids: &[i64],
    series: Series,
    format: Format,
    out: &mut ChunkWriter,
) -> Result<(), DbErr> {
    match format {
        Format::Csv => out.push(series.csv_header()),
        Format::Json => out.push("["),
    }
    out.push("\n");

    for (i, &object_id) in ids.iter().enumerate() {
        let found = access
            .objects(false)
            .filter(object::Column::Id.eq(object_id))
            .one(db)
            .await?;

        if format == Format::Json && i > 0 {
            out.push(",\n");
        }
        let Some(obj) = found else {
            if format == Format::Json {
                out.push(&format!(
                    r#"{{"objectId":{object_id},"error":"not found or not accessible"}}"#
                ));
            }
            continue;
        };

        if format == Format::Json {
            let unit = unit::Entity::find_by_id(obj.unit_symbol.clone())
                .one(db)
                .await?
                .map(UnitResponse::from);
            let unit = serde_json::to_string(&unit).map_err(json_err)?;
            out.push(&format!(r#"{{"objectId":{object_id},"unit":{unit},"values":["#));
        }

        let mut written = 0usize;
        match series {
            Series::Raw { from, to } => {
                for month in query::scan_order(&from, &to) {
                    let rows = query::raw_partition(db, object_id, &month, from, to).await?;
                    write_rows(out, format, &rows, &mut written)?;
                    if !out.flush_if_full().await {
                        return Ok(());
                    }
                }
            }
            Series::Latest { before, depth } => {
                let latest =
                    query::latest_value(db, object_id, before, depth, Some(&obj.creationdate))
                        .await?;
                write_rows(out, format, latest.as_slice(), &mut written)?;
            }
            Series::Aggregated { minutes, from, to } => {
                for month in query::scan_order(&from, &to) {
                    let rows =
                        query::aggregation_partition(db, minutes, object_id, &month, from, to)
                            .await?;
                    write_rows(out, format, &rows, &mut written)?;
                    if !out.flush_if_full().await {
                        return Ok(());
                    }
                }
            }
        }

        if format == Format::Json {
            out.push("]}");
        }
        if !out.flush_if_full().await {
            debug!(object_id, "Client gone, values stream stopped");
            return Ok(());
        }
    }

    if format == Format::Json {
        out.push("\n]");
    }
    Ok(())
}

fn write_rows<R: Row>(
    out: &mut ChunkWriter,
    format: Format,
    rows: &[R],
    written: &mut usize,
) -> Result<(), DbErr> {
    for row in rows {
        match format {
            Format::Json => {
                if *written > 0 {
                    out.push(",");
                }
                out.push(&row.to_json().map_err(json_err)?);
            }
            Format::Csv => {
                out.push(&row.to_csv());
                out.push("\n");
            }
        }
        *written += 1;
    }
    Ok(())
}

fn json_err(e: serde_json::Error) -> DbErr {
    DbErr::Custom(format!("serialization failed: {e}"))
}

/// Accumulates output and forwards it to the response body in chunks.
struct ChunkWriter {
    tx: mpsc::Sender<Result<Bytes, io::Error>>,
    buf: String,
}

impl ChunkWriter {
    fn new(tx: mpsc::Sender<Result<Bytes, io::Error>>) -> Self {
        Self {
            tx,
            buf: String::with_capacity(CHUNK_SIZE),
        }
    }

    fn push(&mut self, s: &str) {
        self.buf.push_str(s);
    }

    /// Forward the buffer once it is large enough. `false` once the
    /// receiving body has been dropped.
    async fn flush_if_full(&mut self) -> bool {
        if self.tx.is_closed() {
            return false;
        }
        if self.buf.len() >= CHUNK_SIZE {
            return self.flush().await;
        }
        true
    }

    async fn flush(&mut self) -> bool {
        if self.buf.is_empty() {
            return !self.tx.is_closed();
        }
        let chunk = std::mem::replace(&mut self.buf, String::with_capacity(CHUNK_SIZE));
        self.tx.send(Ok(Bytes::from(chunk))).await.is_ok()
    }

    async fn finish(mut self) {
        self.flush().await;
    }

    async fn abort(mut self, e: DbErr) {
        if self.flush().await {
            // The client may leave in between; the error is already logged.
            let _ = self.tx.send(Err(io::Error::other(e.to_string()))).await;
        }
    }
}
