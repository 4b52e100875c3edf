use std::fmt;
use std::path::{Path, PathBuf};

use tracing::{error, info};

use crate::error::{Error, Result};
use crate::launcher::RequestId;
use crate::models::{MaterializedFile, PickOutcome};
use crate::platform::CallbackSink;

/// Separator between paths in the `OnMultipleFilesPicked` payload.
pub const MULTI_PATH_DELIMITER: char = '|';

pub const ON_FILE_PICKED: &str = "OnFilePicked";
pub const ON_MULTIPLE_FILES_PICKED: &str = "OnMultipleFilesPicked";
pub const ON_PICKER_CANCELLED: &str = "OnPickerCancelled";
pub const ON_PICKER_ERROR: &str = "OnPickerError";

/// Terminal message sent to the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Callback {
    FilePicked(String),
    /// Paths joined with [`MULTI_PATH_DELIMITER`].
    MultipleFilesPicked(String),
    PickerCancelled,
    PickerError(String),
}

impl Callback {
    pub fn method_name(&self) -> &'static str {
        match self {
            Self::FilePicked(_) => ON_FILE_PICKED,
            Self::MultipleFilesPicked(_) => ON_MULTIPLE_FILES_PICKED,
            Self::PickerCancelled => ON_PICKER_CANCELLED,
            Self::PickerError(_) => ON_PICKER_ERROR,
        }
    }

    pub fn payload(&self) -> &str {
        match self {
            Self::FilePicked(payload)
            | Self::MultipleFilesPicked(payload)
            | Self::PickerError(payload) => payload,
            Self::PickerCancelled => "",
        }
    }
}

/// Joins paths for the multi-result payload.
///
/// A path that already contains the delimiter would be split wrongly by the
/// receiver, so it is an error instead.
pub fn encode_paths<P: AsRef<Path>>(paths: &[P]) -> Result<String> {
    let mut encoded = Vec::with_capacity(paths.len());
    for path in paths {
        let path = path.as_ref();
        let text = path.to_string_lossy();
        if text.contains(MULTI_PATH_DELIMITER) {
            return Err(Error::DelimiterInPath {
                path: path.to_path_buf(),
            });
        }
        encoded.push(text.into_owned());
    }
    Ok(encoded.join(&MULTI_PATH_DELIMITER.to_string()))
}

/// Receiving side of [`encode_paths`].
pub fn decode_paths(payload: &str) -> Vec<PathBuf> {
    payload
        .split(MULTI_PATH_DELIMITER)
        .filter(|path| !path.is_empty())
        .map(PathBuf::from)
        .collect()
}

/// How a request ended, before it is turned into a callback.
#[derive(Debug)]
pub enum Termination {
    Materialized(Vec<MaterializedFile>),
    Cancelled,
    Failed(Error),
}

/// Picks the callback and outcome for a finished request.
pub fn select(allow_multiple: bool, termination: Termination) -> (Callback, PickOutcome) {
    let failed = |err: Error| (Callback::PickerError(err.to_string()), PickOutcome::error(err));

    match termination {
        Termination::Cancelled => (Callback::PickerCancelled, PickOutcome::Cancelled),
        Termination::Failed(err) => failed(err),
        Termination::Materialized(files) if files.is_empty() => failed(Error::EmptyResult),
        Termination::Materialized(files) if allow_multiple => {
            let paths: Vec<&Path> = files.iter().map(|f| f.local_path.as_path()).collect();
            let encoded = encode_paths(&paths);
            match encoded {
                Ok(joined) => (
                    Callback::MultipleFilesPicked(joined),
                    PickOutcome::SuccessMultiple { files },
                ),
                Err(err) => failed(err),
            }
        }
        Termination::Materialized(mut files) => {
            let file = files.swap_remove(0);
            (
                Callback::FilePicked(file.local_path.to_string_lossy().into_owned()),
                PickOutcome::Success { file },
            )
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestState {
    Idle,
    Launched,
    AwaitingPlatformResult,
    Reducing,
    Materializing,
    Completed,
}

impl RequestState {
    fn can_advance_to(self, next: RequestState) -> bool {
        use RequestState::*;
        matches!(
            (self, next),
            (Idle, Launched)
                | (Launched, AwaitingPlatformResult)
                | (AwaitingPlatformResult, Reducing)
                | (Reducing, Materializing)
                | (Idle | Launched | AwaitingPlatformResult | Reducing | Materializing, Completed)
        )
    }
}

impl fmt::Display for RequestState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Tracks one request from launch to its terminal callback.
///
/// [`Lifecycle::complete`] consumes the lifecycle, so a request can emit at
/// most one callback.
#[derive(Debug)]
pub struct Lifecycle {
    id: RequestId,
    state: RequestState,
}

impl Lifecycle {
    pub fn new(id: RequestId) -> Self {
        Self {
            id,
            state: RequestState::Idle,
        }
    }

    pub fn id(&self) -> &RequestId {
        &self.id
    }

    pub fn state(&self) -> RequestState {
        self.state
    }

    pub fn advance(&mut self, next: RequestState) -> Result<()> {
        if !self.state.can_advance_to(next) || next == RequestState::Completed {
            return Err(Error::InvalidTransition {
                from: self.state,
                to: next,
            });
        }
        self.state = next;
        Ok(())
    }

    /// Emits the terminal callback for `termination` and returns the outcome.
    ///
    /// A sink failure is logged; the request is over either way.
    pub fn complete<S>(
        mut self,
        sink: &S,
        target: &str,
        allow_multiple: bool,
        termination: Termination,
    ) -> PickOutcome
    where
        S: CallbackSink + ?Sized,
    {
        debug_assert!(self.state.can_advance_to(RequestState::Completed));
        let (callback, outcome) = select(allow_multiple, termination);
        self.state = RequestState::Completed;

        info!(
            request_id = %self.id,
            callback_target = target,
            callback = callback.method_name(),
            payload = callback.payload(),
            "pick request completed"
        );
        if let Err(err) = sink.deliver(target, &callback) {
            error!(request_id = %self.id, callback_target = target, error = %err, "failed to deliver picker callback");
        }
        outcome
    }
}
