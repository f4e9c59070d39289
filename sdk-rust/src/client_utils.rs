use crate::SynapseError;
use reqwest::{multipart::Form, Client, RequestBuilder, Response, StatusCode};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;

/// Create a JSON request, parse the response.
/// Throws error on non-2xx status code.
pub async fn send_json<T: Serialize + ?Sized, R: DeserializeOwned>(
    client: &Client,
    url: &str,
    data: &T,
) -> Result<R, SynapseError> {
    send(client.post(url).json(data)).await
}

/// Create a multipart request, parse the response.
/// Throws error on non-2xx status code.
pub async fn send_multipart<R: DeserializeOwned>(
    client: &Client,
    url: &str,
    form: Form,
) -> Result<R, SynapseError> {
    send(client.post(url).multipart(form)).await
}

/// Create a request without a body. The response body is ignored.
/// Throws error on non-2xx status code.
pub async fn send_empty(client: &Client, url: &str) -> Result<(), SynapseError> {
    let response = client.post(url).send().await?;
    check_status(response).await.map(|_| ())
}

/// Create a GET request, parse the response.
pub async fn get_json<R: DeserializeOwned>(client: &Client, url: &str) -> Result<R, SynapseError> {
    send(client.get(url)).await
}

async fn send<R: DeserializeOwned>(request: RequestBuilder) -> Result<R, SynapseError> {
    let response = check_status(request.send().await?).await?;
    let bytes = response.bytes().await?;
    // Some endpoints answer 2xx with no body; treat that as `{}` so
    // all-optional response types still parse.
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(serde_json::from_value(Value::Object(serde_json::Map::new()))?);
    }
    Ok(serde_json::from_slice(&bytes)?)
}

async fn check_status(response: Response) -> Result<Response, SynapseError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.bytes().await.unwrap_or_default();
    Err(SynapseError::StatusCode(
        status,
        extract_error_message(status, &body),
    ))
}

/// Pull a human readable message out of an error body. `detail` wins over
/// `message`; anything unparseable falls back to the status text.
pub fn extract_error_message(status: StatusCode, body: &[u8]) -> String {
    let parsed = serde_json::from_slice::<Value>(body).ok();
    let field = parsed.as_ref().and_then(|value| {
        ["detail", "message"]
            .iter()
            .find_map(|key| value.get(key).and_then(render_message))
    });
    field.unwrap_or_else(|| status_text(status))
}

fn render_message(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(text) if text.trim().is_empty() => None,
        Value::String(text) => Some(text.clone()),
        other => Some(other.to_string()),
    }
}

fn status_text(status: StatusCode) -> String {
    status
        .canonical_reason()
        .map_or_else(|| status.as_u16().to_string(), ToString::to_string)
}
