use serde::{Deserialize, Serialize};

use crate::config::DEFAULT_DIALOG_TITLE;

pub const ALL_TYPES: &str = "*/*";

// Extension to MIME type table used in both directions.
const MIME_TABLE: &[(&str, &str)] = &[
    ("stl", "application/sla"),
    ("obj", "text/plain"),
    ("fbx", "application/octet-stream"),
    ("gltf", "model/gltf+json"),
    ("glb", "model/gltf-binary"),
    ("png", "image/png"),
    ("jpg", "image/jpeg"),
    ("jpeg", "image/jpeg"),
    ("gif", "image/gif"),
    ("bmp", "image/bmp"),
    ("pdf", "application/pdf"),
    ("txt", "text/plain"),
    ("json", "application/json"),
    ("xml", "application/xml"),
    ("zip", "application/zip"),
];

/// What to do when the cache already holds a file with the resolved name.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CollisionPolicy {
    /// Last writer wins.
    #[default]
    Overwrite,
    /// Append `_1`, `_2`, … before the extension until the name is free.
    Disambiguate,
}

/// Caller-facing description of what may be picked and where it lands.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PickerOptions {
    pub title: String,
    /// Extensions such as `stl` or `.png`; empty allows every type.
    pub allowed_extensions: Vec<String>,
    pub destination_folder: Option<String>,
    pub collision_policy: CollisionPolicy,
}

impl Default for PickerOptions {
    fn default() -> Self {
        Self {
            title: DEFAULT_DIALOG_TITLE.to_string(),
            allowed_extensions: Vec::new(),
            destination_folder: None,
            collision_policy: CollisionPolicy::default(),
        }
    }
}

impl PickerOptions {
    pub fn for_3d_models() -> Self {
        Self {
            title: "Select 3D Model".into(),
            allowed_extensions: ["stl", "obj", "fbx", "gltf", "glb"].map(String::from).to_vec(),
            destination_folder: Some("Models".into()),
            ..Self::default()
        }
    }

    pub fn for_images() -> Self {
        Self {
            title: "Select Image".into(),
            allowed_extensions: ["png", "jpg", "jpeg", "gif", "bmp"].map(String::from).to_vec(),
            destination_folder: Some("Images".into()),
            ..Self::default()
        }
    }

    pub fn mime_types(&self) -> Vec<String> {
        mime_types_for_extensions(&self.allowed_extensions)
    }
}

fn normalize_extension(ext: &str) -> String {
    ext.trim().trim_start_matches('.').to_ascii_lowercase()
}

/// Maps file extensions to de-duplicated MIME types, preserving first-seen order.
///
/// Unknown extensions map to `application/octet-stream`; an empty input (or one
/// made only of blank entries) allows everything.
pub fn mime_types_for_extensions<S: AsRef<str>>(extensions: &[S]) -> Vec<String> {
    let mut mime_types: Vec<String> = Vec::new();
    for ext in extensions {
        let ext = normalize_extension(ext.as_ref());
        if ext.is_empty() {
            continue;
        }
        let mime = MIME_TABLE
            .iter()
            .find(|(known, _)| *known == ext)
            .map(|(_, mime)| *mime)
            .unwrap_or("application/octet-stream");
        if !mime_types.iter().any(|existing| existing == mime) {
            mime_types.push(mime.to_string());
        }
    }

    if mime_types.is_empty() {
        mime_types.push(ALL_TYPES.to_string());
    }
    mime_types
}

/// Known extensions for a MIME type; `image/*` expands to every image extension.
///
/// Returns an empty list for `*/*` and for types the table does not know.
pub fn extensions_for_mime(mime: &str) -> Vec<&'static str> {
    let mime = mime.trim().to_ascii_lowercase();
    if mime == ALL_TYPES {
        return Vec::new();
    }

    match mime.strip_suffix("/*") {
        Some(primary) => MIME_TABLE
            .iter()
            .filter(|(_, known)| known.split('/').next() == Some(primary))
            .map(|(ext, _)| *ext)
            .collect(),
        None => MIME_TABLE
            .iter()
            .filter(|(_, known)| *known == mime)
            .map(|(ext, _)| *ext)
            .collect(),
    }
}
