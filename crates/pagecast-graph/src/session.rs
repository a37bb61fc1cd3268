//! Resumable upload session.
//!
//! One upload runs three phases against the destination's `videos` or
//! `video_reels` edge:
//!
//! 1. **start** opens a session and returns the asset id and transfer URL
//! 2. **transfer** sends the payload in order, one bounded chunk per request,
//!    each stamped with the current byte offset
//! 3. **finish** publishes (or schedules) the asset
//!
//! [`UploadSession`] owns the offset cursor; only the transfer loop moves it.

use std::fmt;
use std::io::SeekFrom;
use std::ops::Range;
use std::path::{Path, PathBuf};
use std::time::Instant;

use chrono::{DateTime, Utc};
use metrics::{counter, histogram};
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use serde_json::json;
use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tokio::sync::watch;
use tracing::{debug, info};

use pagecast_models::DestinationId;

use crate::cancel::{ensure_active, run_cancellable};
use crate::client::{GraphClient, RawResponse};
use crate::error::{GraphError, GraphResult};
use crate::retry::with_retry;
use crate::types::{AccessToken, FinishResponse, StartResponse, TransferAck, UploadKind};

/// Number of transfer requests needed for `total_bytes`, ignoring server offsets.
pub fn chunk_count(total_bytes: u64, chunk_size: usize) -> u64 {
    let chunk_size = chunk_size.max(1) as u64;
    total_bytes.div_ceil(chunk_size)
}

/// Bytes to upload.
pub enum UploadPayload {
    File { file: File, path: PathBuf, total: u64 },
    Memory(Vec<u8>),
}

impl fmt::Debug for UploadPayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::File { path, total, .. } => f
                .debug_struct("File")
                .field("path", path)
                .field("total", total)
                .finish(),
            Self::Memory(data) => f.debug_tuple("Memory").field(&data.len()).finish(),
        }
    }
}

impl UploadPayload {
    /// Open a local file for reading.
    pub async fn open(path: impl AsRef<Path>) -> GraphResult<Self> {
        let path = path.as_ref();
        let file = File::open(path).await?;
        let total = file.metadata().await?.len();
        Ok(Self::File {
            file,
            path: path.to_path_buf(),
            total,
        })
    }

    pub fn from_bytes(data: impl Into<Vec<u8>>) -> Self {
        Self::Memory(data.into())
    }

    pub fn total_bytes(&self) -> u64 {
        match self {
            Self::File { total, .. } => *total,
            Self::Memory(data) => data.len() as u64,
        }
    }

    /// Read exactly the bytes in `range`.
    pub async fn read_chunk(&mut self, range: Range<u64>) -> GraphResult<Vec<u8>> {
        let total = self.total_bytes();
        if range.start > range.end || range.end > total {
            return Err(GraphError::InvalidPayload(format!(
                "chunk {}..{} outside payload of {} bytes",
                range.start, range.end, total
            )));
        }

        match self {
            Self::File { file, .. } => {
                let mut buf = vec![0u8; (range.end - range.start) as usize];
                file.seek(SeekFrom::Start(range.start)).await?;
                file.read_exact(&mut buf).await?;
                Ok(buf)
            }
            Self::Memory(data) => Ok(data[range.start as usize..range.end as usize].to_vec()),
        }
    }
}

/// Caption and schedule applied by the finish phase.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PublishOptions {
    pub caption: Option<String>,
    /// Publish later instead of immediately
    pub scheduled_at: Option<DateTime<Utc>>,
}

impl PublishOptions {
    fn description(&self) -> Option<&str> {
        self.caption
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
    }
}

/// Server-side upload session and the local offset cursor.
#[derive(Debug, Clone)]
pub struct UploadSession {
    kind: UploadKind,
    destination: DestinationId,
    asset_id: String,
    session_id: String,
    upload_url: String,
    total_bytes: u64,
    offset: u64,
    bytes_sent: u64,
    chunks_sent: u32,
    stalled_chunks: u32,
    max_stalled_chunks: u32,
}

impl UploadSession {
    pub fn new(
        kind: UploadKind,
        destination: DestinationId,
        start: StartResponse,
        total_bytes: u64,
        max_stalled_chunks: u32,
    ) -> Self {
        Self {
            kind,
            destination,
            asset_id: start.video_id,
            session_id: start.upload_session_id,
            upload_url: start.upload_url,
            total_bytes,
            offset: 0,
            bytes_sent: 0,
            chunks_sent: 0,
            stalled_chunks: 0,
            max_stalled_chunks,
        }
    }

    pub fn kind(&self) -> UploadKind {
        self.kind
    }

    pub fn destination(&self) -> &DestinationId {
        &self.destination
    }

    pub fn asset_id(&self) -> &str {
        &self.asset_id
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn upload_url(&self) -> &str {
        &self.upload_url
    }

    pub fn total_bytes(&self) -> u64 {
        self.total_bytes
    }

    pub fn offset(&self) -> u64 {
        self.offset
    }

    pub fn chunks_sent(&self) -> u32 {
        self.chunks_sent
    }

    pub fn is_complete(&self) -> bool {
        self.offset >= self.total_bytes
    }

    /// Byte range of the next chunk.
    pub fn next_chunk(&self, chunk_size: usize) -> Range<u64> {
        let end = self
            .offset
            .saturating_add(chunk_size as u64)
            .min(self.total_bytes);
        self.offset..end
    }

    /// Move the cursor after an accepted chunk of `sent` bytes.
    ///
    /// A server-reported offset is adopted as is; otherwise the cursor
    /// advances by `sent`. The server's offset is authoritative, so one
    /// behind the cursor rewinds it and the next chunk resends from there.
    /// Any ack that does not move the cursor forward counts toward the stall
    /// limit, so a server that keeps rewinding fails the upload. Returns the
    /// new offset.
    pub fn record_chunk(&mut self, sent: u64, ack: TransferAck) -> GraphResult<u64> {
        let next = ack.next_offset.unwrap_or(self.offset + sent);
        if next > self.total_bytes {
            return Err(GraphError::OffsetProtocol(format!(
                "server reported offset {} beyond payload size {}",
                next, self.total_bytes
            )));
        }

        self.chunks_sent += 1;
        self.bytes_sent += sent;

        if next <= self.offset {
            self.stalled_chunks += 1;
            if self.stalled_chunks >= self.max_stalled_chunks {
                return Err(GraphError::OffsetProtocol(format!(
                    "offset stuck at {} after {} chunks",
                    self.offset, self.stalled_chunks
                )));
            }
        } else {
            self.stalled_chunks = 0;
        }

        self.offset = next;
        Ok(next)
    }
}

/// Result of a completed upload.
#[derive(Debug, Clone)]
pub struct UploadReceipt {
    pub asset_id: String,
    pub kind: UploadKind,
    pub chunks_sent: u32,
    pub bytes_sent: u64,
    pub finish: FinishResponse,
}

/// Keep cancellation as is; fold transport failures into the phase error.
fn phase_error(err: GraphError, make: fn(Option<u16>, String) -> GraphError) -> GraphError {
    match err {
        GraphError::Network(e) => make(e.status().map(|s| s.as_u16()), e.to_string()),
        GraphError::InvalidResponse(msg) => make(None, msg),
        other => other,
    }
}

fn finish_params(
    session: &UploadSession,
    token: &AccessToken,
    options: &PublishOptions,
) -> Vec<(&'static str, String)> {
    let mut params = vec![("upload_phase", "finish".to_string())];

    match session.kind() {
        UploadKind::Video => {
            params.push(("access_token", token.expose().to_string()));
            params.push(("upload_session_id", session.session_id().to_string()));
            if let Some(description) = options.description() {
                params.push(("description", description.to_string()));
            }
            if let Some(at) = options.scheduled_at {
                params.push(("scheduled_publish_time", at.timestamp().to_string()));
                params.push(("published", "false".to_string()));
            }
        }
        UploadKind::Reel => {
            params.push(("video_id", session.asset_id().to_string()));
            match options.scheduled_at {
                Some(at) => {
                    params.push(("video_state", "SCHEDULED".to_string()));
                    params.push(("scheduled_publish_time", at.timestamp().to_string()));
                }
                None => params.push(("video_state", "PUBLISHED".to_string())),
            }
            if let Some(description) = options.description() {
                params.push(("description", description.to_string()));
            }
            params.push(("access_token", token.expose().to_string()));
        }
    }

    params
}

impl GraphClient {
    /// Run start, transfer and finish for one destination.
    pub async fn upload(
        &self,
        destination: &DestinationId,
        token: &AccessToken,
        kind: UploadKind,
        payload: &mut UploadPayload,
        options: &PublishOptions,
        cancel: &mut watch::Receiver<bool>,
    ) -> GraphResult<UploadReceipt> {
        let started = Instant::now();

        let mut session = self
            .start_upload(destination, token, kind, payload.total_bytes(), cancel)
            .await?;
        self.transfer(&mut session, token, payload, cancel).await?;
        let finish = self.finish_upload(&session, token, options, cancel).await?;

        histogram!("pagecast_upload_duration_seconds", "kind" => kind.as_str())
            .record(started.elapsed().as_secs_f64());

        Ok(UploadReceipt {
            asset_id: session.asset_id,
            kind,
            chunks_sent: session.chunks_sent,
            bytes_sent: session.bytes_sent,
            finish,
        })
    }

    /// Open an upload session.
    pub async fn start_upload(
        &self,
        destination: &DestinationId,
        token: &AccessToken,
        kind: UploadKind,
        total_bytes: u64,
        cancel: &mut watch::Receiver<bool>,
    ) -> GraphResult<UploadSession> {
        if total_bytes == 0 {
            return Err(GraphError::InvalidPayload("payload is empty".to_string()));
        }

        let url = self.node_url(&[destination.as_str(), kind.edge()]);
        let request = match kind {
            UploadKind::Video => self.http().post(&url).query(&[
                ("upload_phase", "start".to_string()),
                ("access_token", token.expose().to_string()),
                ("file_size", total_bytes.to_string()),
            ]),
            UploadKind::Reel => self.http().post(&url).json(&json!({
                "upload_phase": "start",
                "access_token": token.expose(),
            })),
        };

        let raw = run_cancellable(cancel, async {
            let response = request.send().await?;
            RawResponse::read(response).await
        })
        .await
        .map_err(|e| phase_error(e, |s, m| GraphError::upload_start(s, m)))?;

        if !raw.is_success() {
            return Err(GraphError::upload_start(Some(raw.status), raw.error_message()));
        }

        let body = raw
            .json()
            .map_err(|e| phase_error(e, |s, m| GraphError::upload_start(s, m)))?;
        let start = StartResponse::parse(&body)?;

        info!(
            destination_id = %destination,
            asset_id = %start.video_id,
            kind = kind.as_str(),
            total_bytes,
            chunks = chunk_count(total_bytes, self.config().chunk_size),
            "Upload session started"
        );

        Ok(UploadSession::new(
            kind,
            destination.clone(),
            start,
            total_bytes,
            self.config().max_stalled_chunks,
        ))
    }

    /// Send the payload chunk by chunk until the cursor reaches the end.
    pub async fn transfer(
        &self,
        session: &mut UploadSession,
        token: &AccessToken,
        payload: &mut UploadPayload,
        cancel: &mut watch::Receiver<bool>,
    ) -> GraphResult<()> {
        if payload.total_bytes() != session.total_bytes() {
            return Err(GraphError::InvalidPayload(format!(
                "payload has {} bytes, session expects {}",
                payload.total_bytes(),
                session.total_bytes()
            )));
        }

        let chunk_size = self.config().chunk_size;
        let retry = &self.config().chunk_retry;

        while !session.is_complete() {
            ensure_active(cancel)?;

            let range = session.next_chunk(chunk_size);
            let offset = range.start;
            let chunk = payload.read_chunk(range).await?;
            let sent = chunk.len() as u64;

            let ack = {
                let client = self;
                let url = session.upload_url();
                let chunk = &chunk;
                with_retry(retry, "upload_chunk", cancel, move || {
                    client.send_chunk(url, token, offset, chunk.clone())
                })
                .await?
            };

            let next = session.record_chunk(sent, ack)?;

            counter!("pagecast_upload_chunks_total", "kind" => session.kind().as_str()).increment(1);
            counter!("pagecast_upload_bytes_total").increment(sent);
            debug!(
                destination_id = %session.destination(),
                asset_id = %session.asset_id(),
                offset,
                next_offset = next,
                total_bytes = session.total_bytes(),
                "Chunk accepted"
            );
        }

        Ok(())
    }

    async fn send_chunk(
        &self,
        upload_url: &str,
        token: &AccessToken,
        offset: u64,
        chunk: Vec<u8>,
    ) -> GraphResult<TransferAck> {
        let transport_error = |e: reqwest::Error| GraphError::UploadTransfer {
            status: None,
            body: e.to_string(),
            offset,
        };

        let response = self
            .http()
            .post(upload_url)
            .header(AUTHORIZATION, token.bearer())
            .header(CONTENT_TYPE, "application/octet-stream")
            .header("Offset", offset.to_string())
            .body(chunk)
            .send()
            .await
            .map_err(transport_error)?;

        let raw = match RawResponse::read(response).await {
            Ok(raw) => raw,
            Err(GraphError::Network(e)) => return Err(transport_error(e)),
            Err(e) => return Err(e),
        };

        if !raw.is_success() {
            return Err(GraphError::UploadTransfer {
                status: Some(raw.status),
                body: raw.body.trim().to_string(),
                offset,
            });
        }

        Ok(TransferAck::from_header(raw.offset_header.as_deref()))
    }

    /// Publish or schedule the uploaded asset.
    pub async fn finish_upload(
        &self,
        session: &UploadSession,
        token: &AccessToken,
        options: &PublishOptions,
        cancel: &mut watch::Receiver<bool>,
    ) -> GraphResult<FinishResponse> {
        let url = self.node_url(&[session.destination().as_str(), session.kind().edge()]);
        let params = finish_params(session, token, options);

        let raw = run_cancellable(cancel, async {
            let response = self.http().post(&url).query(&params).send().await?;
            RawResponse::read(response).await
        })
        .await
        .map_err(|e| phase_error(e, |s, m| GraphError::upload_finish(s, m)))?;

        if !raw.is_success() {
            return Err(GraphError::upload_finish(Some(raw.status), raw.error_message()));
        }

        let body = raw
            .json()
            .map_err(|e| phase_error(e, |s, m| GraphError::upload_finish(s, m)))?;
        let finish = FinishResponse::parse(body)?;

        info!(
            destination_id = %session.destination(),
            asset_id = %session.asset_id(),
            chunks = session.chunks_sent(),
            scheduled = options.scheduled_at.is_some(),
            "Upload finished"
        );

        Ok(finish)
    }
}
