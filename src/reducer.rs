use crate::models::ContentHandle;
use crate::platform::RawPickerResult;

/// Normalized picker result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reduced {
    /// Handles to materialize, in platform order. Never empty.
    Handles(Vec<ContentHandle>),
    Cancelled,
}

/// Turns the platform's raw result into handles or a cancellation.
///
/// The multi-item clip wins over the single reference because platforms fill
/// both after a multi-select gesture. Single-select requests keep only the
/// first handle even if the platform returned more.
pub fn reduce(raw: RawPickerResult, allow_multiple: bool) -> Reduced {
    if !raw.accepted {
        return Reduced::Cancelled;
    }

    let mut handles = match (raw.clip, raw.data) {
        (Some(clip), _) if !clip.is_empty() => clip,
        (_, Some(single)) => vec![single],
        _ => return Reduced::Cancelled,
    };

    if !allow_multiple {
        handles.truncate(1);
    }
    Reduced::Handles(handles)
}
