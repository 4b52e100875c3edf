use std::path::Path;

use tauri::{AppHandle, Emitter, EventTarget, Manager, Runtime};
use tauri_plugin_dialog::{Dialog, FilePath};

use crate::dispatch::Callback;
use crate::error::Error;
use crate::launcher::PickerInvocation;
use crate::models::{ContentHandle, PickOutcome, PickRequest};
use crate::pipeline::PickerCore;
use crate::platform::{CallbackSink, ContentResolver, PickerPlatform, RawPickerResult, ResultSender};

const FILTER_NAME: &str = "Allowed files";

/// Access to the content-picker APIs.
pub struct ContentPicker<R: Runtime> {
    app: AppHandle<R>,
    core: PickerCore,
    resolver: Box<dyn ContentResolver>,
}

impl<R: Runtime> ContentPicker<R> {
    pub(crate) fn new(app: AppHandle<R>, core: PickerCore, resolver: Box<dyn ContentResolver>) -> Self {
        Self { app, core, resolver }
    }

    /// Shows the picker, copies the selection into the cache and emits the
    /// terminal callback to `request.callback_target`.
    pub async fn pick(&self, request: PickRequest) -> PickOutcome {
        let platform = DialogPlatform { app: &self.app };
        let sink = EventSink { app: &self.app };
        self.core
            .pick(request, &platform, self.resolver.as_ref(), &sink)
            .await
    }

    pub fn is_active(&self) -> bool {
        self.core.is_active()
    }

    /// Root directory picked files are copied under.
    pub fn cache_root(&self) -> &Path {
        self.core.cache_root()
    }
}

fn content_handle(path: FilePath) -> ContentHandle {
    match path {
        FilePath::Url(url) => ContentHandle::new(url.to_string()),
        FilePath::Path(path) => ContentHandle::new(path.to_string_lossy()),
    }
}

/// Native file dialog from `tauri-plugin-dialog`.
struct DialogPlatform<'a, R: Runtime> {
    app: &'a AppHandle<R>,
}

impl<R: Runtime> PickerPlatform for DialogPlatform<'_, R> {
    fn present(&self, invocation: &PickerInvocation, reply: ResultSender) -> crate::Result<()> {
        let dialog = self
            .app
            .try_state::<Dialog<R>>()
            .ok_or_else(|| Error::LaunchFailure("dialog plugin is not registered".into()))?;

        let mut builder = dialog.file().set_title(invocation.title.clone());
        let extensions = invocation.filter.extensions();
        if !extensions.is_empty() {
            builder = builder.add_filter(FILTER_NAME, &extensions);
        }

        if invocation.allow_multiple {
            builder.pick_files(move |picked| {
                let result = match picked {
                    Some(paths) => {
                        RawPickerResult::multiple(paths.into_iter().map(content_handle).collect())
                    }
                    None => RawPickerResult::cancelled(),
                };
                reply.deliver(result);
            });
        } else {
            builder.pick_file(move |picked| {
                let result = match picked {
                    Some(path) => RawPickerResult::single(content_handle(path)),
                    None => RawPickerResult::cancelled(),
                };
                reply.deliver(result);
            });
        }
        Ok(())
    }
}

/// Emits callbacks as Tauri events named after the callback method.
struct EventSink<'a, R: Runtime> {
    app: &'a AppHandle<R>,
}

impl<R: Runtime> CallbackSink for EventSink<'_, R> {
    fn deliver(&self, target: &str, callback: &Callback) -> crate::Result<()> {
        if target.is_empty() {
            self.app.emit(callback.method_name(), callback.payload())?;
        } else {
            self.app.emit_to(
                EventTarget::AnyLabel {
                    label: target.to_string(),
                },
                callback.method_name(),
                callback.payload(),
            )?;
        }
        Ok(())
    }
}
