use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::config::PickerConfig;
use crate::dispatch::{Lifecycle, RequestState, Termination};
use crate::launcher::{self, RequestId, RequestSlot};
use crate::materializer::Materializer;
use crate::models::{PickOutcome, PickRequest};
use crate::platform::{CallbackSink, ContentResolver, PickerPlatform};
use crate::reducer::{reduce, Reduced};

/// Runs pick requests end to end: launch, wait for the platform, reduce,
/// materialize and emit exactly one callback.
#[derive(Debug)]
pub struct PickerCore {
    config: PickerConfig,
    cache_root: PathBuf,
    slot: RequestSlot,
}

impl PickerCore {
    pub fn new(config: PickerConfig, cache_root: impl Into<PathBuf>) -> Self {
        Self {
            config,
            cache_root: cache_root.into(),
            slot: RequestSlot::new(),
        }
    }

    pub fn config(&self) -> &PickerConfig {
        &self.config
    }

    pub fn cache_root(&self) -> &Path {
        &self.cache_root
    }

    pub fn is_active(&self) -> bool {
        self.slot.is_active()
    }

    /// Handles one request. The returned outcome matches the callback sent to
    /// `request.callback_target`.
    ///
    /// Copying runs on the calling task once the platform result is in; large
    /// files hold it for the duration of the copy.
    pub async fn pick<P, C, S>(
        &self,
        request: PickRequest,
        platform: &P,
        resolver: &C,
        sink: &S,
    ) -> PickOutcome
    where
        P: PickerPlatform + ?Sized,
        C: ContentResolver + ?Sized,
        S: CallbackSink + ?Sized,
    {
        let id = RequestId::new();
        let mut lifecycle = Lifecycle::new(id.clone());
        let target = request.callback_target.clone();
        let allow_multiple = request.allow_multiple;

        let _slot = match self.slot.try_acquire(&id) {
            Ok(guard) => guard,
            Err(err) => {
                return lifecycle.complete(sink, &target, allow_multiple, Termination::Failed(err))
            }
        };

        let termination = self.run(&mut lifecycle, id, &request, platform, resolver).await;
        lifecycle.complete(sink, &target, allow_multiple, termination)
    }

    async fn run<P, C>(
        &self,
        lifecycle: &mut Lifecycle,
        id: RequestId,
        request: &PickRequest,
        platform: &P,
        resolver: &C,
    ) -> Termination
    where
        P: PickerPlatform + ?Sized,
        C: ContentResolver + ?Sized,
    {
        if let Err(err) = lifecycle.advance(RequestState::Launched) {
            return Termination::Failed(err);
        }
        let title = self.config.dialog_title(request);
        let mut in_flight = match launcher::launch(id, request, title, platform) {
            Ok(in_flight) => in_flight,
            Err(err) => return Termination::Failed(err),
        };

        if let Err(err) = lifecycle.advance(RequestState::AwaitingPlatformResult) {
            return Termination::Failed(err);
        }
        let raw = match in_flight.result().await {
            Ok(raw) => raw,
            Err(err) => return Termination::Failed(err),
        };

        if let Err(err) = lifecycle.advance(RequestState::Reducing) {
            return Termination::Failed(err);
        }
        let handles = match reduce(raw, in_flight.allow_multiple) {
            Reduced::Cancelled => {
                info!(request_id = %in_flight.id, "file picker cancelled");
                return Termination::Cancelled;
            }
            Reduced::Handles(handles) => handles,
        };
        debug!(request_id = %in_flight.id, count = handles.len(), "picker returned handles");

        if let Err(err) = lifecycle.advance(RequestState::Materializing) {
            return Termination::Failed(err);
        }
        let settings = self.config.settings_for(&self.cache_root, request);
        let files = Materializer::new(resolver, &settings).materialize_all(&handles);
        Termination::Materialized(files)
    }
}
