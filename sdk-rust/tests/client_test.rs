mod common;

use common::{BoxedError, StubBackend};
use std::env;
use synapse_sdk::{ApiClient, ClientConfig, QueryOperation, BASE_URL_ENV};

#[tokio::test]
async fn health_check_reads_status() -> Result<(), BoxedError> {
    let stub = StubBackend::start().await?;

    let health = stub.client().health().await?;

    assert_eq!(health.status, "healthy");
    assert_eq!(health.message, "Synapse API is running");
    stub.stop().await
}

/// Runs against a real backend. Set `SYNAPSE_API_URL` (or put it in `.env`)
/// and run with `--ignored`.
#[tokio::test]
#[ignore = "requires a running Synapse backend"]
async fn live_backend_answers_health_and_query() -> Result<(), BoxedError> {
    dotenvy::dotenv().ok();
    env::var(BASE_URL_ENV).map_err(|_| format!("{BASE_URL_ENV} must be set"))?;

    let client = ApiClient::new(ClientConfig::from_env()?);
    let health = client.health().await?;
    assert_eq!(health.status, "healthy");

    let operation = QueryOperation::new(client);
    operation.query("What is this knowledge base about?").await;
    let state = operation.state();
    assert!(!state.is_querying);
    assert!(state.last_response.is_some() || state.error.is_some());
    Ok(())
}
