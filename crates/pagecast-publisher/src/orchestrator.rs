//! Batch publishing.
//!
//! A batch is one [`UploadRequest`] fanned out to its destinations in order.
//! Video and reel sources are transcoded once before the first destination
//! and the result is shared read-only by every upload. Each destination gets
//! its own [`UploadOutcome`]; only an invalid request or a failed transcode
//! fail the batch as a whole.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use metrics::{counter, histogram};
use tokio::sync::watch;
use tracing::{info, warn, Instrument};

use pagecast_graph::cancel::sleep_or_cancel;
use pagecast_graph::{
    GraphClient, ImageSource, PublishOptions, UploadKind, UploadPayload, VideoStatus,
};
use pagecast_media::{ScratchFile, TranscodedMedia, Transcoder};
use pagecast_models::{
    BatchReport, ContentKind, DestinationId, MediaSource, PublishStage, RequestError,
    UploadOutcome, UploadRequest,
};

use crate::config::PublisherConfig;
use crate::credentials::CredentialStore;
use crate::error::{PublishError, PublishResult};
use crate::logging::PostLogger;

const CANCELLED: &str = "cancelled";

/// Publishes requests to pages through the Graph API.
#[derive(Clone)]
pub struct Publisher {
    graph: GraphClient,
    credentials: Arc<dyn CredentialStore>,
    transcoder: Arc<dyn Transcoder>,
    config: PublisherConfig,
}

impl Publisher {
    pub fn new(
        graph: GraphClient,
        credentials: Arc<dyn CredentialStore>,
        transcoder: Arc<dyn Transcoder>,
        config: PublisherConfig,
    ) -> Self {
        Self {
            graph,
            credentials,
            transcoder,
            config,
        }
    }

    pub fn config(&self) -> &PublisherConfig {
        &self.config
    }

    /// Normalize a source video for upload.
    ///
    /// The caller owns the returned file.
    pub async fn transcode(
        &self,
        source: &Path,
        cancel: watch::Receiver<bool>,
    ) -> PublishResult<TranscodedMedia> {
        let started = Instant::now();
        let result = self.transcoder.transcode(source, cancel).await;

        let outcome = if result.is_ok() { "success" } else { "failure" };
        counter!("pagecast_transcodes_total", "outcome" => outcome).increment(1);
        histogram!("pagecast_transcode_request_seconds").record(started.elapsed().as_secs_f64());

        Ok(result?)
    }

    /// Current processing status of an uploaded video.
    pub async fn video_status(
        &self,
        destination: &DestinationId,
        asset_id: &str,
        mut cancel: watch::Receiver<bool>,
    ) -> PublishResult<VideoStatus> {
        let token = self
            .credentials
            .lookup(destination)
            .await?
            .ok_or_else(|| PublishError::CredentialNotFound(destination.clone()))?;
        Ok(self.graph.video_status(asset_id, &token, &mut cancel).await?)
    }

    /// Publish `request` to every destination, one after another.
    ///
    /// Returns one outcome per destination, in request order. Fails as a
    /// whole only when the request is invalid or the transcode fails; in both
    /// cases no upload was attempted.
    pub async fn post_media(
        &self,
        request: UploadRequest,
        mut cancel: watch::Receiver<bool>,
    ) -> PublishResult<BatchReport> {
        request.validate(Utc::now())?;

        let batch_id = uuid::Uuid::new_v4().to_string();
        let started = Instant::now();
        info!(
            batch_id = %batch_id,
            kind = request.kind.as_str(),
            destinations = request.destinations.len(),
            scheduled = request.scheduled_at.is_some(),
            "Starting publish batch"
        );

        // Dropping a guard deletes its file, so every early return cleans up
        let source_guard = request
            .discard_media_after
            .then(|| request.media.as_ref().and_then(MediaSource::local_path))
            .flatten()
            .map(ScratchFile::new);

        let transcoded = if request.needs_transcode() {
            let source = request
                .media
                .as_ref()
                .and_then(MediaSource::local_path)
                .ok_or(PublishError::InvalidRequest(
                    RequestError::MissingMedia(request.kind),
                ))?;
            info!(batch_id = %batch_id, source = %source.display(), "Transcoding once for batch");
            let media = self.transcode(source, cancel.clone()).await?;
            Some(ScratchFile::new(media.path))
        } else {
            None
        };

        let upload_path: Option<PathBuf> = match &transcoded {
            Some(file) => Some(file.path().to_path_buf()),
            None => request
                .media
                .as_ref()
                .and_then(MediaSource::local_path)
                .map(Path::to_path_buf),
        };

        let mut outcomes = Vec::with_capacity(request.destinations.len());
        for (index, destination) in request.destinations.iter().enumerate() {
            if index > 0 && sleep_or_cancel(self.config.post_interval, &mut cancel).await.is_err() {
                break;
            }
            if *cancel.borrow() {
                break;
            }

            let logger = PostLogger::new(&batch_id, destination, request.kind);
            let outcome = self
                .publish_one(&request, destination, upload_path.as_deref(), &logger, &mut cancel)
                .instrument(logger.create_span())
                .await;

            let result = if outcome.success { "success" } else { "failure" };
            counter!("pagecast_posts_total", "kind" => request.kind.as_str(), "outcome" => result)
                .increment(1);
            outcomes.push(outcome);
        }

        // Anything not attempted was cut short by cancellation
        for destination in request.destinations.iter().skip(outcomes.len()) {
            outcomes.push(UploadOutcome::failed(
                destination.clone(),
                PublishStage::Pending,
                CANCELLED,
            ));
        }

        if let Some(file) = transcoded {
            if let Err(e) = file.remove().await {
                warn!(batch_id = %batch_id, "Failed to remove transcoded output: {}", e);
            }
        }
        if let Some(file) = source_guard {
            if let Err(e) = file.remove().await {
                warn!(batch_id = %batch_id, "Failed to remove source media: {}", e);
            }
        }

        let report = BatchReport::new(outcomes);
        histogram!("pagecast_batch_duration_seconds").record(started.elapsed().as_secs_f64());
        info!(batch_id = %batch_id, summary = %report.summary, "Publish batch complete");

        Ok(report)
    }

    async fn publish_one(
        &self,
        request: &UploadRequest,
        destination: &DestinationId,
        media_path: Option<&Path>,
        logger: &PostLogger,
        cancel: &mut watch::Receiver<bool>,
    ) -> UploadOutcome {
        logger.log_start();
        let mut stage = PublishStage::Pending;

        match self
            .try_publish(request, destination, media_path, logger, &mut stage, cancel)
            .await
        {
            Ok(remote_id) => {
                logger.log_success(&remote_id);
                UploadOutcome::succeeded(destination.clone(), remote_id)
            }
            Err(e) => {
                logger.log_failure(stage, &e);
                UploadOutcome::failed(destination.clone(), stage, e.to_string())
            }
        }
    }

    async fn try_publish(
        &self,
        request: &UploadRequest,
        destination: &DestinationId,
        media_path: Option<&Path>,
        logger: &PostLogger,
        stage: &mut PublishStage,
        cancel: &mut watch::Receiver<bool>,
    ) -> PublishResult<String> {
        let token = self
            .credentials
            .lookup(destination)
            .await?
            .ok_or_else(|| PublishError::CredentialNotFound(destination.clone()))?;
        *stage = PublishStage::CredentialResolved;

        match request.kind {
            ContentKind::Text => {
                let message = request.caption().unwrap_or_default();
                let post = self
                    .graph
                    .publish_text(destination, &token, message, request.scheduled_at, cancel)
                    .await?;
                *stage = PublishStage::Finished;
                Ok(post.id)
            }
            ContentKind::Image => {
                let image = match (&request.media, media_path) {
                    (Some(MediaSource::RemoteUrl { url }), _) => ImageSource::Url(url.to_string()),
                    (_, Some(path)) => ImageSource::File(path.to_path_buf()),
                    _ => return Err(PublishError::InvalidRequest(
                        RequestError::MissingMedia(request.kind),
                    )),
                };
                let post = self
                    .graph
                    .publish_image(
                        destination,
                        &token,
                        &image,
                        request.caption(),
                        request.scheduled_at,
                        cancel,
                    )
                    .await?;
                *stage = PublishStage::Finished;
                Ok(post.id)
            }
            ContentKind::Video | ContentKind::Reel => {
                let kind = UploadKind::try_from(request.kind)?;
                let path = media_path.ok_or(PublishError::InvalidRequest(
                    RequestError::MissingMedia(request.kind),
                ))?;
                let mut payload = UploadPayload::open(path).await?;

                let mut session = self
                    .graph
                    .start_upload(destination, &token, kind, payload.total_bytes(), cancel)
                    .await?;
                *stage = PublishStage::SessionStarted;
                logger.log_stage(*stage);

                *stage = PublishStage::Transferring;
                self.graph
                    .transfer(&mut session, &token, &mut payload, cancel)
                    .await?;

                let options = PublishOptions {
                    caption: request.caption().map(str::to_string),
                    scheduled_at: request.scheduled_at,
                };
                *stage = PublishStage::Finishing;
                self.graph
                    .finish_upload(&session, &token, &options, cancel)
                    .await?;
                *stage = PublishStage::Finished;
                logger.log_stage(*stage);

                if request.wait_until_ready {
                    *stage = PublishStage::Polling;
                    self.graph
                        .wait_until_ready(session.asset_id(), &token, &self.config.poll, cancel)
                        .await?;
                    *stage = PublishStage::Ready;
                    logger.log_stage(*stage);
                }

                Ok(session.asset_id().to_string())
            }
        }
    }
}
