use std::fmt;
use std::sync::{Mutex, PoisonError};

use tokio::sync::oneshot;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::models::PickRequest;
use crate::options::{extensions_for_mime, ALL_TYPES};
use crate::platform::{result_channel, PickerPlatform, RawPickerResult};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RequestId(String);

impl RequestId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Type filter handed to the platform picker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MimeFilter {
    /// Every type.
    Any,
    /// Exactly one type, used as the picker's primary type.
    Exact(String),
    /// Several types under a `*/*` primary type.
    Set(Vec<String>),
}

impl MimeFilter {
    pub fn from_mime_types(mime_types: &[String]) -> Self {
        match mime_types {
            [] => Self::Any,
            [only] => Self::Exact(only.clone()),
            many => Self::Set(many.to_vec()),
        }
    }

    pub fn primary_type(&self) -> &str {
        match self {
            Self::Exact(mime) => mime,
            Self::Any | Self::Set(_) => ALL_TYPES,
        }
    }

    /// Additional types that accompany a `*/*` primary type.
    pub fn extra_types(&self) -> &[String] {
        match self {
            Self::Set(mimes) => mimes,
            Self::Any | Self::Exact(_) => &[],
        }
    }

    /// File extensions for pickers that filter by extension instead of MIME type.
    ///
    /// Empty when nothing should be filtered, including when some type has no
    /// known extension: filtering then would hide files the caller asked for.
    pub fn extensions(&self) -> Vec<&'static str> {
        let mimes: Vec<&str> = match self {
            Self::Any => return Vec::new(),
            Self::Exact(mime) => vec![mime.as_str()],
            Self::Set(mimes) => mimes.iter().map(String::as_str).collect(),
        };

        let mut extensions = Vec::new();
        for mime in mimes {
            let known = extensions_for_mime(mime);
            if known.is_empty() {
                return Vec::new();
            }
            for ext in known {
                if !extensions.contains(&ext) {
                    extensions.push(ext);
                }
            }
        }
        extensions
    }
}

/// Everything the platform needs to present one picker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PickerInvocation {
    pub request_id: RequestId,
    pub filter: MimeFilter,
    pub allow_multiple: bool,
    pub title: String,
}

impl PickerInvocation {
    pub fn new(request_id: RequestId, request: &PickRequest, title: &str) -> Self {
        Self {
            request_id,
            filter: MimeFilter::from_mime_types(&request.mime_types),
            allow_multiple: request.allow_multiple,
            title: title.to_string(),
        }
    }
}

/// Admits one request at a time.
///
/// A launch while another request is in flight is rejected instead of
/// replacing the running request's state.
#[derive(Debug, Default)]
pub struct RequestSlot {
    active: Mutex<Option<RequestId>>,
}

impl RequestSlot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn try_acquire(&self, id: &RequestId) -> Result<SlotGuard<'_>> {
        let mut active = self.active.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(current) = active.as_ref() {
            warn!(request_id = %id, active_request = %current, "rejecting launch while another pick is active");
            return Err(Error::AlreadyActive);
        }
        *active = Some(id.clone());
        Ok(SlotGuard { slot: self })
    }

    pub fn is_active(&self) -> bool {
        self.active
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    pub fn active_request(&self) -> Option<RequestId> {
        self.active
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

/// Frees the [`RequestSlot`] when dropped.
#[derive(Debug)]
pub struct SlotGuard<'a> {
    slot: &'a RequestSlot,
}

impl Drop for SlotGuard<'_> {
    fn drop(&mut self) {
        let mut active = self.slot.active.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(id) = active.take() {
            debug!(request_id = %id, "released picker slot");
        }
    }
}

/// A launched request waiting for the platform's result.
#[derive(Debug)]
pub struct InFlight {
    pub id: RequestId,
    pub callback_target: String,
    pub allow_multiple: bool,
    pending: Option<oneshot::Receiver<RawPickerResult>>,
}

impl InFlight {
    /// Waits for the platform's result. Only the first call can observe it.
    pub async fn result(&mut self) -> Result<RawPickerResult> {
        let pending = self.pending.take().ok_or(Error::ResultChannelClosed)?;
        pending.await.map_err(|_| Error::ResultChannelClosed)
    }
}

/// Presents the picker for `request`.
///
/// On failure nothing is left waiting: the caller reports the error and the
/// request is over.
pub fn launch<P>(id: RequestId, request: &PickRequest, title: &str, platform: &P) -> Result<InFlight>
where
    P: PickerPlatform + ?Sized,
{
    let invocation = PickerInvocation::new(id.clone(), request, title);
    let (reply, pending) = result_channel(id.clone());

    platform.present(&invocation, reply).map_err(|err| match err {
        Error::LaunchFailure(_) => err,
        other => Error::LaunchFailure(other.to_string()),
    })?;

    info!(
        request_id = %id,
        callback_target = %request.callback_target,
        allow_multiple = request.allow_multiple,
        primary_type = invocation.filter.primary_type(),
        "file picker launched"
    );

    Ok(InFlight {
        id,
        callback_target: request.callback_target.clone(),
        allow_multiple: request.allow_multiple,
        pending: Some(pending),
    })
}
