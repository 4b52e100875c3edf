use tauri::{command, AppHandle, Runtime};

use crate::models::*;
use crate::ContentPickerExt;

/// Result is delivered through the callback events only.
#[command]
pub(crate) async fn pick<R: Runtime>(app: AppHandle<R>, payload: PickRequest) {
    app.content_picker().pick(payload).await;
}

#[command]
pub(crate) async fn pick_async<R: Runtime>(
    app: AppHandle<R>,
    payload: PickRequest,
) -> crate::Result<PickOutcome> {
    Ok(app.content_picker().pick(payload).await)
}

#[command]
pub(crate) fn is_active<R: Runtime>(app: AppHandle<R>) -> bool {
    app.content_picker().is_active()
}
