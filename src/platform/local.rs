use super::{DirEntry, FileMetadata, Platform, PlatformError, PlatformResult, VolumeInfo};
use chrono::{DateTime, Utc};
use std::fs;
use std::io::{self, Read};
use std::path::Path;
use tracing::warn;

/// [`Platform`] backed by the local filesystem
#[derive(Debug, Default, Clone)]
pub struct LocalPlatform;

impl LocalPlatform {
    pub fn new() -> Self {
        Self
    }
}

impl Platform for LocalPlatform {
    fn list_children(&self, path: &Path) -> PlatformResult<Vec<DirEntry>> {
        let entries = fs::read_dir(path).map_err(|e| PlatformError::from_io(path, e))?;

        let mut children = Vec::new();
        for entry in readable(path, entries) {
            let child_path = entry.path();
            // file_type() does not follow symlinks; a link to a directory is
            // still walkable, so resolve it here
            let is_dir = match entry.file_type() {
                Ok(ft) if ft.is_symlink() => child_path.is_dir(),
                Ok(ft) => ft.is_dir(),
                Err(_) => false,
            };
            children.push(DirEntry {
                name: entry.file_name().to_string_lossy().into_owned(),
                path: child_path,
                is_dir,
            });
        }

        Ok(children)
    }

    fn is_directory(&self, path: &Path) -> PlatformResult<bool> {
        fs::metadata(path)
            .map(|m| m.is_dir())
            .map_err(|e| PlatformError::from_io(path, e))
    }

    fn list_volumes(&self) -> PlatformResult<Vec<VolumeInfo>> {
        Ok(mount_points()
            .into_iter()
            .map(|mount_point| VolumeInfo { mount_point })
            .collect())
    }

    fn read_file_content(&self, path: &Path) -> PlatformResult<Box<dyn Read + Send>> {
        let file = fs::File::open(path).map_err(|e| PlatformError::from_io(path, e))?;
        Ok(Box::new(file))
    }

    fn file_metadata(&self, path: &Path) -> PlatformResult<FileMetadata> {
        let link_meta = fs::symlink_metadata(path).map_err(|e| PlatformError::from_io(path, e))?;
        let is_symlink = link_meta.file_type().is_symlink();
        let meta = if is_symlink {
            fs::metadata(path).unwrap_or(link_meta)
        } else {
            link_meta
        };

        Ok(FileMetadata {
            size_bytes: meta.len(),
            modified_at: meta.modified().ok().map(DateTime::<Utc>::from),
            created_at: meta.created().ok().map(DateTime::<Utc>::from),
            owner: owner_name(&meta),
            is_symlink,
        })
    }
}

/// Entries of `dir` that could be read. A failing entry is logged and
/// skipped so the rest of the directory is still listed.
fn readable<T>(
    dir: &Path,
    entries: impl IntoIterator<Item = io::Result<T>>,
) -> impl Iterator<Item = T> {
    entries.into_iter().filter_map(move |entry| match entry {
        Ok(entry) => Some(entry),
        Err(e) => {
            warn!(dir = %dir.display(), error = %e, "skipping unreadable directory entry");
            None
        }
    })
}

#[cfg(target_os = "linux")]
fn mount_points() -> Vec<String> {
    // Device-backed mounts only; pseudo filesystems (proc, sysfs, cgroup...)
    // are not useful search roots
    let mut points = Vec::new();
    if let Ok(mounts) = fs::read_to_string("/proc/mounts") {
        for line in mounts.lines() {
            let mut fields = line.split_whitespace();
            let (Some(device), Some(target)) = (fields.next(), fields.next()) else {
                continue;
            };
            if device.starts_with("/dev/") {
                points.push(unescape_mount(target));
            }
        }
    }
    // The root filesystem is often an overlay or tmpfs in containers
    if !points.iter().any(|p| p == "/") {
        points.insert(0, "/".to_string());
    }
    points
}

/// /proc/mounts escapes whitespace as octal (`\040`)
#[cfg(target_os = "linux")]
fn unescape_mount(raw: &str) -> String {
    raw.replace("\\040", " ")
        .replace("\\011", "\t")
        .replace("\\012", "\n")
        .replace("\\134", "\\")
}

#[cfg(target_os = "macos")]
fn mount_points() -> Vec<String> {
    let mut points = vec!["/".to_string()];
    if let Ok(entries) = fs::read_dir("/Volumes") {
        for entry in entries.flatten() {
            let path = entry.path();
            // The boot volume shows up as a symlink back to /
            if fs::read_link(&path).is_ok() {
                continue;
            }
            points.push(path.to_string_lossy().into_owned());
        }
    }
    points
}

#[cfg(windows)]
fn mount_points() -> Vec<String> {
    (b'A'..=b'Z')
        .map(|letter| format!("{}:\\", letter as char))
        .filter(|root| Path::new(root).exists())
        .collect()
}

#[cfg(not(any(target_os = "linux", target_os = "macos", windows)))]
fn mount_points() -> Vec<String> {
    vec!["/".to_string()]
}

#[cfg(unix)]
fn owner_name(meta: &fs::Metadata) -> Option<String> {
    use std::ffi::CStr;
    use std::os::unix::fs::MetadataExt;

    let uid = meta.uid();
    let mut buf = vec![0 as libc::c_char; 1024];
    let mut pwd: libc::passwd = unsafe { std::mem::zeroed() };
    let mut result: *mut libc::passwd = std::ptr::null_mut();

    // SAFETY: buffers are owned and sized for the call; result is only read
    // when getpwuid_r reports success
    let rc = unsafe {
        libc::getpwuid_r(uid, &mut pwd, buf.as_mut_ptr(), buf.len(), &mut result)
    };
    if rc != 0 || result.is_null() {
        return Some(uid.to_string());
    }

    let name = unsafe { CStr::from_ptr(pwd.pw_name) };
    Some(name.to_string_lossy().into_owned())
}

#[cfg(not(unix))]
fn owner_name(_meta: &fs::Metadata) -> Option<String> {
    None
}
