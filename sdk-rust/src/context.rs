use crate::errors::{SynapseError, SynapseResult};
use serde::{Deserialize, Serialize};

/// A namespace used to tag and filter uploaded and synced data.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "utoipa", derive(utoipa::ToSchema))]
pub struct ProjectContext {
    pub id: String,
    pub name: String,
}

impl ProjectContext {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

/// The known project contexts and the active one.
///
/// The store is a plain value owned by the application and handed to whatever
/// needs it; there is no process-wide instance. The active id always refers to
/// one of the known contexts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextStore {
    contexts: Vec<ProjectContext>,
    active: usize,
}

impl Default for ContextStore {
    fn default() -> Self {
        Self {
            contexts: vec![
                ProjectContext::new("default", "Default Workspace"),
                ProjectContext::new("project-a", "Project A"),
                ProjectContext::new("project-b", "Project B"),
            ],
            active: 0,
        }
    }
}

impl ContextStore {
    /// # Errors
    /// Returns [`SynapseError::InvalidInput`] when `contexts` is empty or has
    /// duplicate ids, and [`SynapseError::UnknownContext`] when `active_id`
    /// is not among them.
    pub fn new(contexts: Vec<ProjectContext>, active_id: &str) -> SynapseResult<Self> {
        if contexts.is_empty() {
            return Err(SynapseError::InvalidInput(
                "at least one project context is required".to_string(),
            ));
        }
        for (index, context) in contexts.iter().enumerate() {
            if contexts[..index].iter().any(|other| other.id == context.id) {
                return Err(SynapseError::InvalidInput(format!(
                    "duplicate project context id `{}`",
                    context.id
                )));
            }
        }
        let active = position(&contexts, active_id)
            .ok_or_else(|| SynapseError::UnknownContext(active_id.to_string()))?;
        Ok(Self { contexts, active })
    }

    /// Known contexts in their original order.
    #[must_use]
    pub fn contexts(&self) -> &[ProjectContext] {
        &self.contexts
    }

    #[must_use]
    pub fn active(&self) -> &ProjectContext {
        &self.contexts[self.active]
    }

    #[must_use]
    pub fn active_id(&self) -> &str {
        &self.active().id
    }

    #[must_use]
    pub fn find(&self, id: &str) -> Option<&ProjectContext> {
        self.contexts.iter().find(|context| context.id == id)
    }

    /// Switch the active context. Unknown ids are rejected and leave the
    /// current selection in place.
    ///
    /// # Errors
    /// Returns [`SynapseError::UnknownContext`] when `id` is not a known context.
    pub fn set_active(&mut self, id: &str) -> SynapseResult<&ProjectContext> {
        let index =
            position(&self.contexts, id).ok_or_else(|| SynapseError::UnknownContext(id.to_string()))?;
        if index != self.active {
            tracing::debug!(from = %self.active_id(), to = %id, "switching project context");
        }
        self.active = index;
        Ok(self.active())
    }
}

fn position(contexts: &[ProjectContext], id: &str) -> Option<usize> {
    contexts.iter().position(|context| context.id == id)
}
