use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Where an uploaded file should land on the service side.
///
/// Sent as part of init metadata; the service resolves it to a storage
/// location and reports the final path back on completion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadDestination {
    pub project_id: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub directory: String,
}

impl UploadDestination {
    /// Flattens the destination into init-request metadata entries.
    pub fn to_metadata(&self) -> HashMap<String, String> {
        let mut meta = HashMap::new();
        meta.insert("projectId".to_string(), self.project_id.clone());
        if !self.directory.is_empty() {
            meta.insert("directory".to_string(), self.directory.clone());
        }
        meta
    }
}
