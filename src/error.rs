use std::path::PathBuf;

use serde::{ser::Serializer, Serialize};

use crate::dispatch::RequestState;

pub type Result<T> = std::result::Result<T, Error>;

/// Failures of a pick request.
///
/// `StreamOpen` and `Copy` are per-item and never reach the caller on their
/// own: the pipeline drops the item and only the aggregate shows up as
/// [`Error::EmptyResult`].
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Failed to open file picker: {0}")]
    LaunchFailure(String),
    #[error("Picker is already active")]
    AlreadyActive,
    #[error("Failed to open content stream for {handle}")]
    StreamOpen {
        handle: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to copy content into {}", path.display())]
    Copy {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to copy selected files")]
    EmptyResult,
    #[error("Picker closed without delivering a result")]
    ResultChannelClosed,
    #[error("Selected file path contains the '|' delimiter")]
    DelimiterInPath { path: PathBuf },
    #[error("Invalid request transition from {from} to {to}")]
    InvalidTransition { from: RequestState, to: RequestState },
    #[error(transparent)]
    Tauri(#[from] tauri::Error),
    #[cfg(mobile)]
    #[error(transparent)]
    PluginInvoke(#[from] tauri::plugin::mobile::PluginInvokeError),
}

impl Serialize for Error {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.to_string().as_ref())
    }
}
