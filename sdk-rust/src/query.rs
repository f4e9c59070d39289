use crate::{
    client::ApiClient,
    config::Endpoint,
    errors::SynapseResult,
    notice::{Notice, Notifier, TracingNotifier},
    opentelemetry::{OperationKind, OperationSpan},
    progress::FinishGuard,
    task_slot::TaskSlot,
    types::{ErrorInfo, QueryRequest, QueryResult},
};
use std::sync::Arc;
use tokio::sync::watch;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryState {
    pub is_querying: bool,
    /// The latest successful answer.
    pub last_response: Option<QueryResult>,
    pub error: Option<ErrorInfo>,
}

/// Asks questions against the knowledge base and tracks the in-flight call.
///
/// There is no internal guard: two concurrent [`query`](Self::query) calls
/// both run, and whichever resolves last owns `last_response` and clears
/// `is_querying`. Callers that need exclusivity should disable their submit
/// control while `is_querying` is set, or use [`try_query`](Self::try_query).
#[derive(Clone)]
pub struct QueryOperation {
    client: ApiClient,
    notifier: Arc<dyn Notifier>,
    state: Arc<watch::Sender<QueryState>>,
    slot: TaskSlot,
}

impl QueryOperation {
    #[must_use]
    pub fn new(client: ApiClient) -> Self {
        Self {
            client,
            notifier: Arc::new(TracingNotifier),
            state: Arc::new(watch::Sender::new(QueryState::default())),
            slot: TaskSlot::new("query"),
        }
    }

    #[must_use]
    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    #[must_use]
    pub fn state(&self) -> QueryState {
        self.state.borrow().clone()
    }

    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<QueryState> {
        self.state.subscribe()
    }

    #[must_use]
    pub fn is_querying(&self) -> bool {
        self.state.borrow().is_querying
    }

    /// Ask a question. Returns `None` when the question is blank or the call
    /// failed; failures are recorded in [`QueryState::error`] and notified.
    pub async fn query(&self, question: &str) -> Option<QueryResult> {
        self.query_with(QueryRequest::new(question)).await
    }

    /// Like [`query`](Self::query), with full control over the request body
    /// (e.g. a `contextId` to restrict the search).
    pub async fn query_with(&self, request: QueryRequest) -> Option<QueryResult> {
        let question = request.question.trim();
        if question.is_empty() {
            self.notifier.notify(Notice::warning(
                "Empty question",
                "Please enter a question before submitting.",
            ));
            return None;
        }
        let request = QueryRequest {
            question: question.to_string(),
            ..request
        };

        let mut span = OperationSpan::new(OperationKind::Query);
        if let Some(context_id) = &request.context_id {
            span.set_context(context_id);
        }

        self.state.send_modify(|state| {
            state.is_querying = true;
            state.error = None;
        });
        let _finish = FinishGuard::new(&self.state, |state| state.is_querying = false);

        let result = span
            .instrument_future(
                self.client
                    .post_json::<_, QueryResult>(Endpoint::Query, &request),
            )
            .await;

        match result {
            Ok(response) => {
                let response = response.with_source_ids();
                span.set_count("synapse.query.sources", response.sources.len());
                self.state
                    .send_modify(|state| state.last_response = Some(response.clone()));
                Some(response)
            }
            Err(error) => {
                span.on_error(&error);
                tracing::warn!(code = %error.code(), "query failed: {error}");
                let info = ErrorInfo::from(&error);
                self.notifier
                    .notify(Notice::error("Query failed", info.message.clone()));
                self.state.send_modify(|state| state.error = Some(info));
                None
            }
        }
    }

    /// Ask a question unless another guarded query is still running.
    ///
    /// # Errors
    /// Returns [`crate::SynapseError::Busy`] while a previous `try_query` is
    /// in flight.
    pub async fn try_query(&self, question: &str) -> SynapseResult<Option<QueryResult>> {
        let _permit = self.slot.try_acquire()?;
        Ok(self.query(question).await)
    }
}
