use tauri::{
    plugin::{Builder, TauriPlugin},
    Manager, Runtime,
};

pub use config::{MaterializeSettings, PickerConfig};
pub use dispatch::{decode_paths, encode_paths, Callback, RequestState, MULTI_PATH_DELIMITER};
pub use launcher::{MimeFilter, PickerInvocation, RequestId};
pub use models::*;
pub use options::{extensions_for_mime, mime_types_for_extensions, CollisionPolicy, PickerOptions};
pub use pipeline::PickerCore;
pub use platform::{CallbackSink, ContentResolver, PickerPlatform, RawPickerResult, ResultSender};

#[cfg(desktop)]
mod desktop;
#[cfg(mobile)]
mod mobile;

mod commands;
mod config;
pub mod dispatch;
mod error;
pub mod launcher;
pub mod materializer;
mod models;
mod options;
mod picker;
mod pipeline;
mod platform;
pub mod reducer;

pub use error::{Error, Result};
pub use picker::ContentPicker;

/// Extensions to [`tauri::App`], [`tauri::AppHandle`] and [`tauri::Window`] to access the content-picker APIs.
pub trait ContentPickerExt<R: Runtime> {
    fn content_picker(&self) -> &ContentPicker<R>;
}

impl<R: Runtime, T: Manager<R>> crate::ContentPickerExt<R> for T {
    fn content_picker(&self) -> &ContentPicker<R> {
        self.state::<ContentPicker<R>>().inner()
    }
}

/// Initializes the plugin.
///
/// The host must also register `tauri-plugin-dialog`, and on mobile
/// `tauri-plugin-fs`; without them every pick ends in `OnPickerError`.
pub fn init<R: Runtime>() -> TauriPlugin<R, Option<PickerConfig>> {
    Builder::<R, Option<PickerConfig>>::new("content-picker")
        .invoke_handler(tauri::generate_handler![
            commands::pick,
            commands::pick_async,
            commands::is_active
        ])
        .setup(|app, api| {
            #[cfg(mobile)]
            let content_picker = mobile::init(app, api)?;
            #[cfg(desktop)]
            let content_picker = desktop::init(app, api)?;
            app.manage(content_picker);
            Ok(())
        })
        .build()
}
