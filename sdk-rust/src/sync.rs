use crate::{
    client::ApiClient,
    config::Endpoint,
    context::ProjectContext,
    errors::{SynapseError, SynapseResult},
    notice::{Notice, Notifier, TracingNotifier},
    opentelemetry::{OperationKind, OperationSpan},
    progress::{schedule_reset, FinishGuard, Generation},
    task_slot::TaskSlot,
    types::{GitHubSyncParams, SlackSyncParams, SyncKind, SyncResponse, SyncResult},
};
use reqwest::multipart::Form;
use serde::Serialize;
use std::{collections::HashSet, sync::Arc};
use tokio::sync::watch;

/// Branch requested from the GitHub reader.
pub const DEFAULT_GITHUB_BRANCH: &str = "main";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncState {
    pub is_syncing: bool,
    pub sync_progress: u8,
    /// Which sync is in flight; `None` when idle.
    pub sync_type: Option<SyncKind>,
}

impl SyncState {
    fn reset(&mut self) {
        self.is_syncing = false;
        self.sync_type = None;
    }
}

/// Pulls Slack channels or GitHub repositories into the knowledge base.
///
/// States are `idle`, `syncing(slack)` and `syncing(github)`. Only one sync
/// is expected in flight at a time, but the plain `sync_*` methods do not
/// enforce it; the `try_sync_*` variants reject a second call with
/// [`SynapseError::Busy`].
#[derive(Clone)]
pub struct SyncOperation {
    client: ApiClient,
    notifier: Arc<dyn Notifier>,
    state: Arc<watch::Sender<SyncState>>,
    generation: Generation,
    slot: TaskSlot,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GitHubSyncBody<'a> {
    owner: &'a str,
    repo: &'a str,
    context_id: &'a str,
    branch: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    token: Option<&'a str>,
    #[serde(rename = "includePRs", skip_serializing_if = "Option::is_none")]
    include_prs: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    include_issues: Option<bool>,
}

impl SyncOperation {
    #[must_use]
    pub fn new(client: ApiClient) -> Self {
        Self {
            client,
            notifier: Arc::new(TracingNotifier),
            state: Arc::new(watch::Sender::new(SyncState::default())),
            generation: Generation::default(),
            slot: TaskSlot::new("sync"),
        }
    }

    #[must_use]
    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    #[must_use]
    pub fn state(&self) -> SyncState {
        *self.state.borrow()
    }

    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<SyncState> {
        self.state.subscribe()
    }

    #[must_use]
    pub fn is_syncing(&self) -> bool {
        self.state.borrow().is_syncing
    }

    /// Sync the given Slack channels into `context`.
    pub async fn sync_slack(&self, context: &ProjectContext, params: SlackSyncParams) -> SyncResult {
        let channel_ids = match validate_channels(&params.channel_ids) {
            Ok(channel_ids) => channel_ids,
            Err(error) => return self.reject(&error),
        };

        let mut form = Form::new()
            .text("channel_ids", channel_ids.join(","))
            .text("contextId", context.id.clone());
        if let Some(token) = params.token.filter(|token| !token.trim().is_empty()) {
            form = form.text("token", token);
        }

        let mut span = OperationSpan::new(OperationKind::SyncSlack);
        span.set_context(&context.id);
        span.set_count("synapse.sync.channels", channel_ids.len());

        self.run(span, SyncKind::Slack, async {
            self.client
                .post_multipart::<SyncResponse>(Endpoint::SyncSlack, form)
                .await
        })
        .await
    }

    /// Sync issues and pull requests of `owner/repo` into `context`.
    pub async fn sync_github(
        &self,
        context: &ProjectContext,
        params: GitHubSyncParams,
    ) -> SyncResult {
        let owner = params.owner.trim();
        let repo = params.repo.trim();
        if owner.is_empty() || repo.is_empty() {
            return self.reject(&SynapseError::InvalidInput(
                "Both repository owner and name are required.".to_string(),
            ));
        }

        let body = GitHubSyncBody {
            owner,
            repo,
            context_id: &context.id,
            branch: DEFAULT_GITHUB_BRANCH,
            token: params.token.as_deref().filter(|token| !token.trim().is_empty()),
            include_prs: params.include_prs,
            include_issues: params.include_issues,
        };

        let mut span = OperationSpan::new(OperationKind::SyncGitHub);
        span.set_context(&context.id);

        self.run(span, SyncKind::GitHub, async {
            self.client
                .post_json::<_, SyncResponse>(Endpoint::SyncGitHub, &body)
                .await
        })
        .await
    }

    /// [`sync_slack`](Self::sync_slack), rejected while another guarded sync
    /// runs.
    ///
    /// # Errors
    /// Returns [`SynapseError::Busy`] when a guarded sync is in flight.
    pub async fn try_sync_slack(
        &self,
        context: &ProjectContext,
        params: SlackSyncParams,
    ) -> SynapseResult<SyncResult> {
        let _permit = self.slot.try_acquire()?;
        Ok(self.sync_slack(context, params).await)
    }

    /// [`sync_github`](Self::sync_github), rejected while another guarded
    /// sync runs.
    ///
    /// # Errors
    /// Returns [`SynapseError::Busy`] when a guarded sync is in flight.
    pub async fn try_sync_github(
        &self,
        context: &ProjectContext,
        params: GitHubSyncParams,
    ) -> SynapseResult<SyncResult> {
        let _permit = self.slot.try_acquire()?;
        Ok(self.sync_github(context, params).await)
    }

    /// Ask the backend to stop the running sync and stop waiting for it.
    ///
    /// Returns `true` when idle (nothing to cancel) or when the backend
    /// accepted the cancellation. The backend may still finish its work; its
    /// late response is returned to the original caller but no longer touches
    /// the state or emits notices.
    pub async fn cancel_sync(&self) -> bool {
        if !self.is_syncing() {
            return true;
        }

        let mut span = OperationSpan::new(OperationKind::CancelSync);
        let result = span
            .instrument_future(self.client.post_empty(Endpoint::SyncCancel))
            .await;

        match result {
            Ok(()) => {
                self.generation.bump();
                self.state.send_modify(|state| {
                    state.reset();
                    state.sync_progress = 0;
                });
                self.notifier.notify(Notice::info(
                    "Sync cancelled",
                    "The sync operation has been cancelled.",
                ));
                true
            }
            Err(error) => {
                span.on_error(&error);
                tracing::warn!(code = %error.code(), "sync cancel failed: {error}");
                self.notifier
                    .notify(Notice::error("Cancel failed", error.user_message()));
                false
            }
        }
    }

    fn reject(&self, error: &SynapseError) -> SyncResult {
        let message = error.user_message();
        self.notifier
            .notify(Notice::warning("Invalid sync request", message.clone()));
        SyncResult::failed(message)
    }

    async fn run<F>(&self, mut span: OperationSpan, kind: SyncKind, request: F) -> SyncResult
    where
        F: std::future::Future<Output = SynapseResult<SyncResponse>>,
    {
        let owner = self.generation.bump();
        self.state.send_modify(|state| {
            state.is_syncing = true;
            state.sync_type = Some(kind);
            state.sync_progress = 0;
        });
        let finish =
            FinishGuard::new(&self.state, SyncState::reset).owned_by(&self.generation, owner);

        let outcome = span.instrument_future(request).await;
        // After a cancel the state belongs to whatever runs next.
        let current = self.generation.is_current(owner);
        if !current {
            tracing::debug!(kind = kind.as_str(), "late response of a cancelled sync ignored");
        }

        let result = match outcome {
            Ok(response) => {
                if let Some(count) = response.synced_count {
                    span.set_count(
                        "synapse.sync.synced_count",
                        usize::try_from(count).unwrap_or(usize::MAX),
                    );
                }
                if current {
                    self.state.send_modify(|state| state.sync_progress = 100);
                    self.notifier.notify(Notice::success(
                        format!("{} sync complete", kind_label(kind)),
                        success_description(kind, response.synced_count),
                    ));
                }
                let message = response
                    .message
                    .unwrap_or_else(|| format!("{} sync completed.", kind_label(kind)));
                SyncResult {
                    success: true,
                    message,
                    synced_count: response.synced_count,
                    sync_id: response.sync_id,
                }
            }
            Err(error) => {
                span.on_error(&error);
                tracing::warn!(kind = kind.as_str(), code = %error.code(), "sync failed: {error}");
                let message = error.user_message();
                if current {
                    self.notifier.notify(Notice::error(
                        format!("{} sync failed", kind_label(kind)),
                        message.clone(),
                    ));
                }
                SyncResult::failed(message)
            }
        };

        drop(finish);
        span.on_end();
        schedule_reset(
            &self.state,
            &self.generation,
            owner,
            self.client.config().progress_reset_delay,
            |state| state.sync_progress = 0,
        );
        result
    }
}

/// Trimmed, deduplicated channel ids in first-seen order, or an error when
/// the list is empty or any id is blank.
fn validate_channels(channel_ids: &[String]) -> SynapseResult<Vec<String>> {
    if channel_ids.is_empty() {
        return Err(SynapseError::InvalidInput(
            "At least one Slack channel id is required.".to_string(),
        ));
    }
    let mut seen = HashSet::new();
    let mut unique = Vec::with_capacity(channel_ids.len());
    for id in channel_ids {
        let id = id.trim();
        if id.is_empty() {
            return Err(SynapseError::InvalidInput(
                "Slack channel ids must not be blank.".to_string(),
            ));
        }
        if seen.insert(id) {
            unique.push(id.to_string());
        }
    }
    Ok(unique)
}

fn kind_label(kind: SyncKind) -> &'static str {
    match kind {
        SyncKind::Slack => "Slack",
        SyncKind::GitHub => "GitHub",
    }
}

fn success_description(kind: SyncKind, synced_count: Option<u64>) -> String {
    match synced_count {
        Some(count) => format!("Synced {count} items from {}.", kind_label(kind)),
        None => format!("{} data has been added to the knowledge base.", kind_label(kind)),
    }
}
