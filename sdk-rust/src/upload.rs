use crate::{
    client::ApiClient,
    config::Endpoint,
    errors::SynapseResult,
    notice::{Notice, Notifier, TracingNotifier},
    opentelemetry::{OperationKind, OperationSpan},
    progress::{percent, schedule_reset, FinishGuard, Generation},
    types::{UploadFile, UploadResponse, UploadResult},
};
use reqwest::multipart::{Form, Part};
use std::sync::Arc;
use tokio::sync::watch;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UploadState {
    pub is_uploading: bool,
    /// 0..=100. Approximated from the number of finished files, not bytes.
    pub upload_progress: u8,
}

/// Uploads documents to the knowledge base.
///
/// Upload failures never escape as errors: every call returns an
/// [`UploadResult`] and emits a notice.
#[derive(Clone)]
pub struct UploadOperation {
    client: ApiClient,
    notifier: Arc<dyn Notifier>,
    state: Arc<watch::Sender<UploadState>>,
    generation: Generation,
}

impl UploadOperation {
    #[must_use]
    pub fn new(client: ApiClient) -> Self {
        Self {
            client,
            notifier: Arc::new(TracingNotifier),
            state: Arc::new(watch::Sender::new(UploadState::default())),
            generation: Generation::default(),
        }
    }

    #[must_use]
    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    #[must_use]
    pub fn state(&self) -> UploadState {
        *self.state.borrow()
    }

    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<UploadState> {
        self.state.subscribe()
    }

    pub async fn upload_one(&self, file: UploadFile) -> UploadResult {
        let owner = self.generation.bump();
        self.state.send_modify(|state| {
            state.is_uploading = true;
            state.upload_progress = 0;
        });
        let finish = FinishGuard::new(&self.state, |state| state.is_uploading = false)
            .owned_by(&self.generation, owner);

        let result = self.send_file(file).await;
        if result.success && self.generation.is_current(owner) {
            self.state.send_modify(|state| state.upload_progress = 100);
        }

        drop(finish);
        self.schedule_progress_reset(owner);
        result
    }

    /// Upload files one after another, in order. A failed file does not stop
    /// the batch; inspect each result's `success` flag. Progress ends at 100
    /// only if at least one file made it, matching `upload_one`.
    pub async fn upload_many(&self, files: Vec<UploadFile>) -> Vec<UploadResult> {
        let total = files.len();
        let mut span = OperationSpan::new(OperationKind::UploadBatch);
        span.set_count("synapse.upload.files", total);

        let owner = self.generation.bump();
        self.state.send_modify(|state| {
            state.is_uploading = true;
            state.upload_progress = 0;
        });
        let finish = FinishGuard::new(&self.state, |state| state.is_uploading = false)
            .owned_by(&self.generation, owner);

        let mut results = Vec::with_capacity(total);
        for (index, file) in files.into_iter().enumerate() {
            if index > 0 && !self.client.config().upload_pacing.is_zero() {
                tokio::time::sleep(self.client.config().upload_pacing).await;
            }
            if self.generation.is_current(owner) {
                self.state
                    .send_modify(|state| state.upload_progress = percent(index, total));
            }
            let result = span.instrument_future(self.send_file(file)).await;
            results.push(result);
        }

        let failed = results.iter().filter(|result| !result.success).count();
        span.set_count("synapse.upload.failed", failed);
        if failed < total && self.generation.is_current(owner) {
            self.state.send_modify(|state| state.upload_progress = 100);
        }

        drop(finish);
        span.on_end();
        self.schedule_progress_reset(owner);
        results
    }

    async fn send_file(&self, file: UploadFile) -> UploadResult {
        let mut span = OperationSpan::new(OperationKind::Upload);
        if let Some(context_id) = &file.context_id {
            span.set_context(context_id);
        }
        span.set_count("synapse.upload.bytes", file.bytes.len());
        let filename = file.filename.clone();

        let response = match into_form(file) {
            Ok(form) => {
                span.instrument_future(
                    self.client
                        .post_multipart::<UploadResponse>(Endpoint::Upload, form),
                )
                .await
            }
            Err(error) => Err(error),
        };

        match response {
            Ok(response) => {
                let message = response
                    .message
                    .unwrap_or_else(|| "File uploaded successfully.".to_string());
                tracing::debug!(%filename, "uploaded");
                self.notifier.notify(Notice::success(
                    "Upload successful",
                    format!("{filename} has been added to the knowledge base."),
                ));
                UploadResult {
                    success: true,
                    message,
                    file_id: response.file_id,
                }
            }
            Err(error) => {
                span.on_error(&error);
                tracing::warn!(%filename, code = %error.code(), "upload failed: {error}");
                let message = error.user_message();
                self.notifier.notify(Notice::error(
                    "Upload failed",
                    format!("{filename}: {message}"),
                ));
                UploadResult::failed(message)
            }
        }
    }

    fn schedule_progress_reset(&self, owner: u64) {
        schedule_reset(
            &self.state,
            &self.generation,
            owner,
            self.client.config().progress_reset_delay,
            |state| state.upload_progress = 0,
        );
    }
}

fn into_form(file: UploadFile) -> SynapseResult<Form> {
    let content_type = file.content_type().to_string();
    let part = Part::bytes(file.bytes)
        .file_name(file.filename)
        .mime_str(&content_type)?;
    let form = Form::new().part("file", part);
    Ok(match file.context_id {
        Some(context_id) => form.text("contextId", context_id),
        None => form,
    })
}
