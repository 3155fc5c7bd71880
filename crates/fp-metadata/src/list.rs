//! listMetadata query types.

use serde::{Deserialize, Serialize};

/// Maximum type/folder queries per `listMetadata` call; the server rejects
/// larger groups.
pub const LIST_QUERY_BATCH: usize = 3;

/// One type (optionally scoped to a folder) to list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListQuery {
    /// Canonical metadata type name, e.g. `ApexClass`.
    pub metadata_type: String,
    /// Folder to list within, for folder-grouped types.
    pub folder: Option<String>,
}

impl ListQuery {
    pub fn new(metadata_type: impl Into<String>) -> Self {
        Self {
            metadata_type: metadata_type.into(),
            folder: None,
        }
    }

    pub fn in_folder(metadata_type: impl Into<String>, folder: impl Into<String>) -> Self {
        Self {
            metadata_type: metadata_type.into(),
            folder: Some(folder.into()),
        }
    }
}
