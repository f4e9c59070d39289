use synapse_sdk::{ErrorInfo, QueryOperation, QueryResult};

/// Something that can answer a question. Implemented by
/// [`QueryOperation`]; tests substitute their own.
#[async_trait::async_trait]
pub trait Ask: Send + Sync {
    /// `None` when the question could not be answered.
    async fn ask(&self, question: &str) -> Option<QueryResult>;

    /// The failure behind the last `None`, when known.
    fn last_error(&self) -> Option<ErrorInfo> {
        None
    }
}

#[async_trait::async_trait]
impl Ask for QueryOperation {
    async fn ask(&self, question: &str) -> Option<QueryResult> {
        self.query(question).await
    }

    fn last_error(&self) -> Option<ErrorInfo> {
        self.state().error
    }
}
