use std::fs::File;
use std::io::{self, Read};
use std::path::PathBuf;

use tauri::{plugin::PluginApi, AppHandle, Manager, Runtime};

use crate::config::PickerConfig;
use crate::models::ContentHandle;
use crate::picker::ContentPicker;
use crate::pipeline::PickerCore;
use crate::platform::ContentResolver;

pub fn init<R: Runtime>(
    app: &AppHandle<R>,
    api: PluginApi<R, Option<PickerConfig>>,
) -> crate::Result<ContentPicker<R>> {
    let config = api.config().clone().unwrap_or_default();
    let cache_root = app.path().app_cache_dir()?;
    Ok(ContentPicker::new(
        app.clone(),
        PickerCore::new(config, cache_root),
        Box::new(LocalFileResolver),
    ))
}

/// Desktop dialogs hand out plain paths (or `file://` URLs).
pub struct LocalFileResolver;

fn local_path(handle: &ContentHandle) -> PathBuf {
    match url::Url::parse(handle.as_str()) {
        Ok(url) if url.scheme() == "file" => url
            .to_file_path()
            .unwrap_or_else(|_| PathBuf::from(handle.as_str())),
        _ => PathBuf::from(handle.as_str()),
    }
}

impl ContentResolver for LocalFileResolver {
    fn display_name(&self, handle: &ContentHandle) -> io::Result<Option<String>> {
        Ok(local_path(handle)
            .file_name()
            .map(|name| name.to_string_lossy().into_owned()))
    }

    fn open(&self, handle: &ContentHandle) -> io::Result<Box<dyn Read + Send>> {
        Ok(Box::new(File::open(local_path(handle))?))
    }
}
