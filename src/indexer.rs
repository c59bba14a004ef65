//! Workspace enumeration and the JSON key index.

pub mod key_index;
pub mod types;
pub mod workspace;

pub use key_index::{
    IndexedJson,
    KeyIndex,
};
pub use types::IndexerError;
pub use workspace::WorkspaceFiles;
