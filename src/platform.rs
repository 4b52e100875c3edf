//! Seams between the pick pipeline and the host platform.
//!
//! The pipeline never talks to a dialog, a content provider or an event bus
//! directly; it goes through these three traits. The Tauri bindings live in
//! [`crate::picker`], tests use in-memory fakes.

use std::io::{self, Read};

use tokio::sync::oneshot;
use tracing::debug;

use crate::dispatch::Callback;
use crate::launcher::{PickerInvocation, RequestId};
use crate::models::ContentHandle;

/// What the platform hands back once the user leaves the picker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawPickerResult {
    /// `false` when the user dismissed the picker or it reported a negative result.
    pub accepted: bool,
    /// Multi-item selection, in platform order.
    pub clip: Option<Vec<ContentHandle>>,
    /// Single-item selection.
    pub data: Option<ContentHandle>,
}

impl RawPickerResult {
    pub fn cancelled() -> Self {
        Self {
            accepted: false,
            clip: None,
            data: None,
        }
    }

    pub fn single(handle: ContentHandle) -> Self {
        Self {
            accepted: true,
            clip: None,
            data: Some(handle),
        }
    }

    pub fn multiple(handles: Vec<ContentHandle>) -> Self {
        Self {
            accepted: true,
            clip: Some(handles),
            data: None,
        }
    }
}

/// Single-shot reply channel handed to the platform with each invocation.
#[derive(Debug)]
pub struct ResultSender {
    request_id: RequestId,
    tx: oneshot::Sender<RawPickerResult>,
}

impl ResultSender {
    /// Delivers the result. Returns `false` if the request is no longer waiting.
    pub fn deliver(self, result: RawPickerResult) -> bool {
        let delivered = self.tx.send(result).is_ok();
        if !delivered {
            debug!(request_id = %self.request_id, "picker result arrived after the request ended");
        }
        delivered
    }

    pub fn request_id(&self) -> &RequestId {
        &self.request_id
    }
}

pub(crate) fn result_channel(
    request_id: RequestId,
) -> (ResultSender, oneshot::Receiver<RawPickerResult>) {
    let (tx, rx) = oneshot::channel();
    (ResultSender { request_id, tx }, rx)
}

/// The native file-selection capability.
pub trait PickerPlatform: Send + Sync {
    /// Presents the picker. The result must be sent through `reply` at most
    /// once; an `Err` means the picker could not be shown at all.
    fn present(&self, invocation: &PickerInvocation, reply: ResultSender) -> crate::Result<()>;
}

/// Access to the bytes and metadata behind content handles.
pub trait ContentResolver: Send + Sync {
    /// Human-readable name from the provider's metadata, if it has one.
    fn display_name(&self, handle: &ContentHandle) -> io::Result<Option<String>>;

    fn open(&self, handle: &ContentHandle) -> io::Result<Box<dyn Read + Send>>;
}

/// Named-message channel back to the host.
pub trait CallbackSink: Send + Sync {
    fn deliver(&self, target: &str, callback: &Callback) -> crate::Result<()>;
}
