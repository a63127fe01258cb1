//! Registries for areas and scenes
//!
//! The host platform owns area and scene data; this engine only reads it.
//! The read side is modeled as the [`AreaSource`] and [`SceneSource`] traits
//! so tests (and embedders) can inject fakes. In-memory registry
//! implementations are provided for hosts that keep the data in process.
//!
//! The [`AreaSceneIndex`] derives the area -> scenes membership model from
//! the sources and is the input to entity creation.

mod area;
mod index;
mod scene;

pub use area::{Area, AreaSource, MemoryAreaRegistry};
pub use index::{AreaSceneIndex, AreaScenes, IndexSnapshot};
pub use scene::{MemorySceneRegistry, Scene, SceneSource};

use thiserror::Error;

/// Errors reported by registry sources
#[derive(Debug, Clone, Error)]
pub enum RegistryError {
    /// The source cannot answer right now; callers keep their last-known data
    #[error("registry temporarily unavailable: {0}")]
    Unavailable(String),
}
