use crate::{config::Endpoint, SynapseError};
use opentelemetry::trace::Status;
use std::time::Instant;
use tracing::{info_span, Span};
use tracing_futures::Instrument;
use tracing_opentelemetry::OpenTelemetrySpanExt;

#[derive(Clone, Copy)]
pub enum OperationKind {
    Query,
    Upload,
    UploadBatch,
    SyncSlack,
    SyncGitHub,
    CancelSync,
}

impl OperationKind {
    fn as_str(self) -> &'static str {
        match self {
            Self::Query => "query",
            Self::Upload => "upload",
            Self::UploadBatch => "upload_many",
            Self::SyncSlack => "sync_slack",
            Self::SyncGitHub => "sync_github",
            Self::CancelSync => "cancel_sync",
        }
    }

    fn endpoint(self) -> Endpoint {
        match self {
            Self::Query => Endpoint::Query,
            Self::Upload | Self::UploadBatch => Endpoint::Upload,
            Self::SyncSlack => Endpoint::SyncSlack,
            Self::SyncGitHub => Endpoint::SyncGitHub,
            Self::CancelSync => Endpoint::SyncCancel,
        }
    }
}

pub struct OperationSpan {
    span: Span,
    start_time: Instant,
    ended: bool,
}

impl OperationSpan {
    pub fn new(kind: OperationKind) -> Self {
        let span = match kind {
            OperationKind::Query => info_span!("synapse.query"),
            OperationKind::Upload | OperationKind::UploadBatch => info_span!("synapse.upload"),
            OperationKind::SyncSlack | OperationKind::SyncGitHub => info_span!("synapse.sync"),
            OperationKind::CancelSync => info_span!("synapse.cancel"),
        };
        span.set_attribute("synapse.operation", kind.as_str());
        span.set_attribute("http.request.method", "POST");
        span.set_attribute("http.route", kind.endpoint().path());

        Self {
            span,
            start_time: Instant::now(),
            ended: false,
        }
    }

    pub fn set_context(&self, context_id: &str) {
        self.span
            .set_attribute("synapse.context_id", context_id.to_string());
    }

    pub fn set_count(&self, key: &'static str, value: usize) {
        self.span
            .set_attribute(key, i64::try_from(value).unwrap_or(i64::MAX));
    }

    pub async fn instrument_future<F>(&self, future: F) -> F::Output
    where
        F: std::future::Future,
    {
        future.instrument(self.span.clone()).await
    }

    pub fn on_error(&mut self, error: &SynapseError) {
        if let SynapseError::StatusCode(status, _) = error {
            self.span
                .set_attribute("http.response.status_code", i64::from(status.as_u16()));
        }
        self.span.set_attribute("error.type", error.code());
        self.span
            .set_attribute("exception.message", error.to_string());
        self.span.set_status(Status::error(error.to_string()));
    }

    pub fn on_end(&mut self) {
        if self.ended {
            return;
        }
        self.ended = true;
        self.span.set_attribute(
            "synapse.duration_seconds",
            self.start_time.elapsed().as_secs_f64(),
        );
    }
}

impl Drop for OperationSpan {
    fn drop(&mut self) {
        self.on_end();
    }
}
