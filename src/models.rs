use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Deserializer, Serialize};

use crate::options::{CollisionPolicy, PickerOptions};

/// A request to pick one or more files, as sent by the host.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PickRequest {
    /// Label the terminal callback is emitted to.
    pub callback_target: String,
    #[serde(default)]
    pub allow_multiple: bool,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub mime_types: Vec<String>,
    /// Overrides the configured dialog title.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Overrides the configured cache subfolder.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub destination_folder: Option<String>,
    /// Overrides the configured collision policy.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collision_policy: Option<CollisionPolicy>,
}

impl PickRequest {
    pub fn new(callback_target: impl Into<String>) -> Self {
        Self {
            callback_target: callback_target.into(),
            allow_multiple: false,
            mime_types: Vec::new(),
            title: None,
            destination_folder: None,
            collision_policy: None,
        }
    }

    /// Builds a request whose MIME filters come from the extensions in `options`.
    pub fn from_options(
        callback_target: impl Into<String>,
        options: &PickerOptions,
        allow_multiple: bool,
    ) -> Self {
        Self {
            callback_target: callback_target.into(),
            allow_multiple,
            mime_types: options.mime_types(),
            title: Some(options.title.clone()),
            destination_folder: options.destination_folder.clone(),
            collision_policy: Some(options.collision_policy),
        }
    }

    pub fn allow_multiple(mut self, allow_multiple: bool) -> Self {
        self.allow_multiple = allow_multiple;
        self
    }

    pub fn mime_types<I, S>(mut self, mime_types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.mime_types = mime_types.into_iter().map(Into::into).collect();
        self
    }
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<String>>::deserialize(deserializer)?.unwrap_or_default())
}

/// Opaque reference to a selectable item, as handed out by the platform.
///
/// The identifier is a URI (`content://…`, `file://…`) or a platform path; it
/// is only meaningful to the [`ContentResolver`](crate::ContentResolver) that
/// produced it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ContentHandle(String);

impl ContentHandle {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether the identifier is an Android `content://` URI, whose name only
    /// the owning provider knows.
    pub fn is_content_uri(&self) -> bool {
        self.0
            .get(..10)
            .is_some_and(|scheme| scheme.eq_ignore_ascii_case("content://"))
    }

    /// Last non-empty path segment of the identifier, percent-decoded.
    pub fn last_path_segment(&self) -> Option<String> {
        let segment = match url::Url::parse(&self.0) {
            Ok(url) if !url.cannot_be_a_base() => url
                .path_segments()?
                .filter(|segment| !segment.is_empty())
                .last()?
                .to_string(),
            _ => self
                .0
                .rsplit(|ch| ch == '/' || ch == '\\')
                .find(|segment| !segment.is_empty())?
                .to_string(),
        };

        let decoded = percent_encoding::percent_decode_str(&segment)
            .decode_utf8_lossy()
            .into_owned();
        if decoded.is_empty() {
            None
        } else {
            Some(decoded)
        }
    }
}

impl fmt::Display for ContentHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryDisplayNameRequest {
    pub uri: String,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryDisplayNameResponse {
    #[serde(default)]
    pub display_name: Option<String>,
}

/// A picked item copied into the local cache.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MaterializedFile {
    pub local_path: PathBuf,
    pub display_name: String,
}

/// The single terminal result of a [`PickRequest`].
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum PickOutcome {
    Success { file: MaterializedFile },
    SuccessMultiple { files: Vec<MaterializedFile> },
    Cancelled,
    Error { message: String },
}

impl PickOutcome {
    pub fn error(err: impl fmt::Display) -> Self {
        Self::Error {
            message: err.to_string(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. } | Self::SuccessMultiple { .. })
    }

    /// Local paths of every materialized file, in pick order.
    pub fn paths(&self) -> Vec<PathBuf> {
        match self {
            Self::Success { file } => vec![file.local_path.clone()],
            Self::SuccessMultiple { files } => {
                files.iter().map(|file| file.local_path.clone()).collect()
            }
            Self::Cancelled | Self::Error { .. } => Vec::new(),
        }
    }
}
