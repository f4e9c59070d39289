use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::path::Path;

/// Origin of a retrieved source.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[cfg_attr(feature = "utoipa", derive(utoipa::ToSchema))]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Document,
    Slack,
    GitHub,
}

/// Identifying fields of a source. Which fields are present depends on
/// `kind`: documents carry `filename`, Slack messages `channel`, GitHub items
/// `pr` (and usually `owner`/`repo`).
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[cfg_attr(feature = "utoipa", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct SourceMetadata {
    #[serde(rename = "type", alias = "source_type", default)]
    pub kind: Option<SourceKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    #[serde(alias = "channel_id", default, skip_serializing_if = "Option::is_none")]
    pub channel: Option<String>,
    #[serde(
        default,
        deserialize_with = "string_or_number",
        skip_serializing_if = "Option::is_none"
    )]
    pub pr: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repo: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context_id: Option<String>,
}

/// One retrieved evidence fragment backing an answer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[cfg_attr(feature = "utoipa", derive(utoipa::ToSchema))]
pub struct Source {
    /// Unique within one response. Filled in from the position when the
    /// backend omits it.
    #[serde(default)]
    pub id: String,
    pub content: String,
    #[serde(default)]
    pub metadata: SourceMetadata,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
}

/// Label shown when a source carries none of its identifying fields.
pub const UNKNOWN_SOURCE_LABEL: &str = "Unknown source";

impl Source {
    /// The identifying field to display for this source: filename, channel or
    /// pull request, whichever is present, else a generic label.
    #[must_use]
    pub fn label(&self) -> String {
        let metadata = &self.metadata;
        if let Some(filename) = &metadata.filename {
            return filename.clone();
        }
        if let Some(channel) = &metadata.channel {
            return format!("#{channel}");
        }
        if let Some(pr) = &metadata.pr {
            return match (&metadata.owner, &metadata.repo) {
                (Some(owner), Some(repo)) => format!("{owner}/{repo}#{pr}"),
                _ => format!("PR #{pr}"),
            };
        }
        UNKNOWN_SOURCE_LABEL.to_string()
    }
}

/// Answer to one question.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[cfg_attr(feature = "utoipa", derive(utoipa::ToSchema))]
pub struct QueryResult {
    pub answer: String,
    #[serde(default)]
    pub sources: Vec<Source>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
}

impl QueryResult {
    /// Give every source without an id a positional one (`source-<index>`).
    pub(crate) fn with_source_ids(mut self) -> Self {
        for (index, source) in self.sources.iter_mut().enumerate() {
            if source.id.trim().is_empty() {
                source.id = format!("source-{index}");
            }
        }
        self
    }
}

/// Body of `POST /api/query`.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[cfg_attr(feature = "utoipa", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct QueryRequest {
    pub question: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context_id: Option<String>,
}

impl QueryRequest {
    pub fn new(question: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            context_id: None,
        }
    }

    #[must_use]
    pub fn with_context(mut self, context: &crate::ProjectContext) -> Self {
        self.context_id = Some(context.id.clone());
        self
    }
}

/// Outcome of uploading one file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[cfg_attr(feature = "utoipa", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct UploadResult {
    pub success: bool,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_id: Option<String>,
}

impl UploadResult {
    pub(crate) fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            file_id: None,
        }
    }
}

/// Outcome of a Slack or GitHub sync.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[cfg_attr(feature = "utoipa", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct SyncResult {
    pub success: bool,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub synced_count: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sync_id: Option<String>,
}

impl SyncResult {
    pub(crate) fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            synced_count: None,
            sync_id: None,
        }
    }
}

/// Success body of the upload endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct UploadResponse {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default, deserialize_with = "string_or_number")]
    pub file_id: Option<String>,
}

/// Success body of the sync endpoints.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SyncResponse {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default, alias = "synced_count")]
    pub synced_count: Option<u64>,
    #[serde(default, alias = "sync_id", deserialize_with = "string_or_number")]
    pub sync_id: Option<String>,
}

/// Body of the health endpoint.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[cfg_attr(feature = "utoipa", derive(utoipa::ToSchema))]
pub struct HealthStatus {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub status: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[cfg_attr(feature = "utoipa", derive(utoipa::ToSchema))]
#[serde(rename_all = "lowercase")]
pub enum SyncKind {
    Slack,
    #[serde(rename = "github")]
    GitHub,
}

impl SyncKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Slack => "slack",
            Self::GitHub => "github",
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[cfg_attr(feature = "utoipa", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct SlackSyncParams {
    pub channel_ids: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

impl SlackSyncParams {
    pub fn new<I, S>(channel_ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            channel_ids: channel_ids.into_iter().map(Into::into).collect(),
            token: None,
        }
    }

    #[must_use]
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[cfg_attr(feature = "utoipa", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct GitHubSyncParams {
    pub owner: String,
    pub repo: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(default, rename = "includePRs", skip_serializing_if = "Option::is_none")]
    pub include_prs: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub include_issues: Option<bool>,
}

impl GitHubSyncParams {
    pub fn new(owner: impl Into<String>, repo: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            repo: repo.into(),
            ..Default::default()
        }
    }

    #[must_use]
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }
}

/// Normalized failure recorded in operation state.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[cfg_attr(feature = "utoipa", derive(utoipa::ToSchema))]
pub struct ErrorInfo {
    pub message: String,
    pub code: String,
}

impl From<&crate::SynapseError> for ErrorInfo {
    fn from(error: &crate::SynapseError) -> Self {
        Self {
            message: error.user_message(),
            code: error.code(),
        }
    }
}

/// A file to send to the upload endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadFile {
    pub filename: String,
    pub bytes: Vec<u8>,
    pub mime_type: Option<String>,
    pub context_id: Option<String>,
}

impl UploadFile {
    pub fn new(filename: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            filename: filename.into(),
            bytes: bytes.into(),
            mime_type: None,
            context_id: None,
        }
    }

    /// Read a file from disk, keeping only its file name.
    ///
    /// # Errors
    /// Returns [`crate::SynapseError::Io`] when the file cannot be read and
    /// [`crate::SynapseError::InvalidInput`] when the path has no file name.
    pub async fn from_path(path: impl AsRef<Path>) -> crate::SynapseResult<Self> {
        let path = path.as_ref();
        let filename = path
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| {
                crate::SynapseError::InvalidInput(format!(
                    "path `{}` has no file name",
                    path.display()
                ))
            })?
            .to_string();
        let bytes = tokio::fs::read(path).await?;
        Ok(Self::new(filename, bytes))
    }

    #[must_use]
    pub fn with_mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = Some(mime_type.into());
        self
    }

    #[must_use]
    pub fn with_context(mut self, context: &crate::ProjectContext) -> Self {
        self.context_id = Some(context.id.clone());
        self
    }

    /// The declared MIME type, or one guessed from the extension.
    #[must_use]
    pub fn content_type(&self) -> &str {
        if let Some(mime_type) = &self.mime_type {
            return mime_type;
        }
        let extension = Path::new(&self.filename)
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase);
        match extension.as_deref() {
            Some("txt") => "text/plain",
            Some("md" | "markdown") => "text/markdown",
            _ => "application/octet-stream",
        }
    }
}

/// Accept either a JSON string or a JSON number for identifier fields.
fn string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(value)) => Some(value),
        Some(Value::Number(value)) => Some(value.to_string()),
        Some(Value::Null) | None => None,
        Some(other) => Some(other.to_string()),
    })
}
