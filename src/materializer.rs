//! Copies picked content into the local cache.
//!
//! Every item is handled on its own: a handle that cannot be named, opened or
//! copied fails alone and [`Materializer::materialize_all`] drops it from the
//! batch. Source and destination streams live in the scope of a single
//! [`Materializer::materialize`] call and are closed on every exit path.
//! Bytes land in a staging file first; the destination only changes once the
//! whole item has been copied.

use std::fs;
use std::io::{self, ErrorKind, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use tempfile::NamedTempFile;
use tracing::{info, warn};

use crate::config::MaterializeSettings;
use crate::dispatch::MULTI_PATH_DELIMITER;
use crate::error::{Error, Result};
use crate::models::{ContentHandle, MaterializedFile};
use crate::options::CollisionPolicy;
use crate::platform::ContentResolver;

static FALLBACK_COUNTER: AtomicU64 = AtomicU64::new(0);

pub struct Materializer<'a, C: ContentResolver + ?Sized> {
    resolver: &'a C,
    settings: &'a MaterializeSettings,
}

impl<'a, C: ContentResolver + ?Sized> Materializer<'a, C> {
    pub fn new(resolver: &'a C, settings: &'a MaterializeSettings) -> Self {
        Self { resolver, settings }
    }

    /// Copies each handle in order and keeps the ones that succeeded.
    pub fn materialize_all(&self, handles: &[ContentHandle]) -> Vec<MaterializedFile> {
        let mut files = Vec::with_capacity(handles.len());
        for handle in handles {
            match self.materialize(handle) {
                Ok(file) => files.push(file),
                Err(err) => {
                    warn!(handle = %handle, error = %err, "dropping picked item that could not be copied");
                }
            }
        }
        files
    }

    pub fn materialize(&self, handle: &ContentHandle) -> Result<MaterializedFile> {
        let display_name = resolve_display_name(self.resolver, handle);

        let mut source = self.resolver.open(handle).map_err(|source| Error::StreamOpen {
            handle: handle.to_string(),
            source,
        })?;

        fs::create_dir_all(&self.settings.cache_dir).map_err(|source| Error::Copy {
            path: self.settings.cache_dir.clone(),
            source,
        })?;
        let destination = destination_path(
            &self.settings.cache_dir,
            &display_name,
            self.settings.collision_policy,
        );

        // Persisted over the destination only after a complete copy.
        let bytes = NamedTempFile::new_in(&self.settings.cache_dir)
            .and_then(|mut staged| {
                let copied = copy_stream(&mut source, &mut staged, self.settings.buffer_size)?;
                staged.flush()?;
                staged.persist(&destination).map_err(|err| err.error)?;
                Ok(copied)
            })
            .map_err(|source| Error::Copy {
                path: destination.clone(),
                source,
            })?;

        info!(handle = %handle, path = %destination.display(), bytes, "copied picked file");
        Ok(MaterializedFile {
            local_path: destination,
            display_name,
        })
    }
}

/// Name for the local copy: provider metadata, then the handle's last path
/// segment, then a timestamped placeholder.
pub fn resolve_display_name<C>(resolver: &C, handle: &ContentHandle) -> String
where
    C: ContentResolver + ?Sized,
{
    let from_metadata = match resolver.display_name(handle) {
        Ok(name) => name,
        Err(err) => {
            warn!(handle = %handle, error = %err, "display name query failed");
            None
        }
    };

    from_metadata
        .as_deref()
        .and_then(sanitize_file_name)
        .or_else(|| handle.last_path_segment().as_deref().and_then(sanitize_file_name))
        .unwrap_or_else(fallback_file_name)
}

/// Reduces `raw` to a single file name that stays inside the cache directory.
pub fn sanitize_file_name(raw: &str) -> Option<String> {
    let name = raw
        .rsplit(|ch| ch == '/' || ch == '\\')
        .next()
        .unwrap_or_default()
        .trim();
    if name.is_empty() || name == "." || name == ".." {
        return None;
    }

    Some(
        name.chars()
            .map(|ch| {
                if ch == MULTI_PATH_DELIMITER || ch.is_control() {
                    '_'
                } else {
                    ch
                }
            })
            .collect(),
    )
}

fn fallback_file_name() -> String {
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis())
        .unwrap_or_default();
    match FALLBACK_COUNTER.fetch_add(1, Ordering::Relaxed) {
        0 => format!("file_{millis}"),
        n => format!("file_{millis}_{n}"),
    }
}

/// Where `name` lands in `dir` under `policy`.
pub fn destination_path(dir: &Path, name: &str, policy: CollisionPolicy) -> PathBuf {
    let candidate = dir.join(name);
    if policy == CollisionPolicy::Overwrite || !candidate.exists() {
        return candidate;
    }

    let as_path = Path::new(name);
    let stem = as_path
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| name.to_string());
    let extension = as_path
        .extension()
        .map(|ext| format!(".{}", ext.to_string_lossy()))
        .unwrap_or_default();

    (1u64..)
        .map(|counter| dir.join(format!("{stem}_{counter}{extension}")))
        .find(|path| !path.exists())
        .unwrap_or(candidate)
}

/// Fixed-buffer copy loop. Returns the number of bytes written.
pub fn copy_stream<R, W>(reader: &mut R, writer: &mut W, buffer_size: usize) -> io::Result<u64>
where
    R: Read + ?Sized,
    W: Write + ?Sized,
{
    let mut buffer = vec![0u8; buffer_size.max(1)];
    let mut total = 0u64;
    loop {
        let read = match reader.read(&mut buffer) {
            Ok(0) => return Ok(total),
            Ok(read) => read,
            Err(err) if err.kind() == ErrorKind::Interrupted => continue,
            Err(err) => return Err(err),
        };
        writer.write_all(&buffer[..read])?;
        total += read as u64;
    }
}
