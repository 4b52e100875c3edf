use std::io::{self, ErrorKind, Read};

use tauri::{
    plugin::{PluginApi, PluginHandle},
    AppHandle, Manager, Runtime,
};
use tauri_plugin_fs::{FilePath, Fs, OpenOptions};
use tracing::debug;

use crate::config::PickerConfig;
use crate::models::{ContentHandle, QueryDisplayNameRequest, QueryDisplayNameResponse};
use crate::picker::ContentPicker;
use crate::pipeline::PickerCore;
use crate::platform::ContentResolver;

pub fn init<R: Runtime>(
    app: &AppHandle<R>,
    api: PluginApi<R, Option<PickerConfig>>,
) -> crate::Result<ContentPicker<R>> {
    let config = api.config().clone().unwrap_or_default();
    let cache_root = app.path().app_cache_dir()?;

    // iOS hands out file URLs that already end in the real file name.
    #[cfg(target_os = "android")]
    let native = Some(api.register_android_plugin("app.tauri.contentpicker", "ContentPickerPlugin")?);
    #[cfg(not(target_os = "android"))]
    let native = None;

    Ok(ContentPicker::new(
        app.clone(),
        PickerCore::new(config, cache_root),
        Box::new(FsPluginResolver {
            app: app.clone(),
            native,
        }),
    ))
}

/// Opens content URIs through `tauri-plugin-fs`, which knows how to read
/// Android `content://` and iOS security-scoped URLs. Display names come from
/// the native side's provider query.
pub struct FsPluginResolver<R: Runtime> {
    app: AppHandle<R>,
    native: Option<PluginHandle<R>>,
}

impl<R: Runtime> ContentResolver for FsPluginResolver<R> {
    fn display_name(&self, handle: &ContentHandle) -> io::Result<Option<String>> {
        let Some(native) = self.native.as_ref().filter(|_| handle.is_content_uri()) else {
            return Ok(None);
        };

        let response: QueryDisplayNameResponse = native
            .run_mobile_plugin(
                "queryDisplayName",
                QueryDisplayNameRequest {
                    uri: handle.as_str().to_owned(),
                },
            )
            .map_err(|err| io::Error::new(ErrorKind::Other, err.to_string()))?;
        debug!(handle = %handle, name = ?response.display_name, "provider display name");
        Ok(response.display_name)
    }

    fn open(&self, handle: &ContentHandle) -> io::Result<Box<dyn Read + Send>> {
        let fs = self
            .app
            .try_state::<Fs<R>>()
            .ok_or_else(|| io::Error::new(ErrorKind::Unsupported, "fs plugin is not registered"))?;
        let path = handle
            .as_str()
            .parse::<FilePath>()
            .map_err(|err| io::Error::new(ErrorKind::InvalidInput, err.to_string()))?;

        let mut options = OpenOptions::new();
        options.read(true);
        let file = fs.open(path, options)?;
        Ok(Box::new(file))
    }
}
