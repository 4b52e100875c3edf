use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::models::PickRequest;
use crate::options::CollisionPolicy;

pub const DEFAULT_BUFFER_SIZE: usize = 8192;
pub const DEFAULT_DIALOG_TITLE: &str = "Select File";

/// Plugin configuration, read from `plugins.content-picker` in `tauri.conf.json`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PickerConfig {
    /// Subfolder of the app cache dir that receives picked files.
    pub destination_folder: Option<String>,
    pub collision_policy: CollisionPolicy,
    /// Copy buffer size in bytes. Zero falls back to the default.
    pub buffer_size: usize,
    pub dialog_title: Option<String>,
}

impl Default for PickerConfig {
    fn default() -> Self {
        Self {
            destination_folder: None,
            collision_policy: CollisionPolicy::Overwrite,
            buffer_size: DEFAULT_BUFFER_SIZE,
            dialog_title: None,
        }
    }
}

impl PickerConfig {
    /// Settings for one request, rooted at `cache_root` and honoring the
    /// request's overrides.
    pub fn settings_for(&self, cache_root: &Path, request: &PickRequest) -> MaterializeSettings {
        let folder = request
            .destination_folder
            .as_deref()
            .or(self.destination_folder.as_deref())
            .filter(|folder| !folder.trim().is_empty());

        MaterializeSettings {
            cache_dir: match folder {
                Some(folder) => cache_root.join(folder),
                None => cache_root.to_path_buf(),
            },
            collision_policy: request.collision_policy.unwrap_or(self.collision_policy),
            buffer_size: if self.buffer_size == 0 {
                DEFAULT_BUFFER_SIZE
            } else {
                self.buffer_size
            },
        }
    }

    pub fn dialog_title<'a>(&'a self, request: &'a PickRequest) -> &'a str {
        request
            .title
            .as_deref()
            .or(self.dialog_title.as_deref())
            .unwrap_or(DEFAULT_DIALOG_TITLE)
    }
}

/// Where and how the materializer writes files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaterializeSettings {
    pub cache_dir: PathBuf,
    pub collision_policy: CollisionPolicy,
    pub buffer_size: usize,
}

impl MaterializeSettings {
    pub fn new(cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            cache_dir: cache_dir.into(),
            collision_policy: CollisionPolicy::Overwrite,
            buffer_size: DEFAULT_BUFFER_SIZE,
        }
    }
}
