//! Outbound activation command seam

use async_trait::async_trait;
use thiserror::Error;

use scenes_core::{Context, SceneId};

/// Errors reported by the host's scene activation interface
#[derive(Debug, Clone, Error)]
pub enum ActivationError {
    #[error("scene does not exist: {0}")]
    NotFound(SceneId),

    #[error("activation service error: {0}")]
    ServiceError(String),
}

/// Requests that the host platform perform a scene's effects
///
/// The command carries the caller's context so activation echoes coming back
/// over the bus can be traced to the selection that caused them.
#[async_trait]
pub trait SceneActivator: Send + Sync {
    async fn activate(&self, scene_id: &SceneId, context: &Context) -> Result<(), ActivationError>;
}
