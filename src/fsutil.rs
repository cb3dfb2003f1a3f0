use crate::{Error, GeneratedUnitFile, Result};

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

static TMP_COUNTER: AtomicU64 = AtomicU64::new(0);

#[cfg(unix)]
const UNIT_FILE_MODE: u32 = 0o644;

/// Write a rendered unit into the staging directory, replacing any previous file.
pub(crate) fn write_unit_file(
    staging_dir: &Path,
    unit: &str,
    contents: String,
) -> Result<GeneratedUnitFile> {
    validate_unit_file_name(unit)?;

    let path = unit_file_path(staging_dir, unit);
    atomic_write(&path, contents.as_bytes())
        .map_err(|e| map_unitfile_io("write_unit_file", "write unit file", &path, e))?;

    Ok(GeneratedUnitFile {
        unit: unit.to_string(),
        path,
        contents,
    })
}

/// Place `contents` at `<systemd_system_dir>/<unit>`.
///
/// Returns `false` when an identical file is already installed.
pub(crate) fn install_unit_file(
    systemd_system_dir: &Path,
    unit: &str,
    contents: &[u8],
) -> Result<bool> {
    validate_unit_file_name(unit)?;

    let path = unit_file_path(systemd_system_dir, unit);
    fs::create_dir_all(systemd_system_dir).map_err(|e| {
        map_unitfile_io(
            "install_unit_file",
            "create unit directory",
            systemd_system_dir,
            e,
        )
    })?;

    let existing = match fs::read(&path) {
        Ok(b) => Some(b),
        Err(e) if e.kind() == io::ErrorKind::NotFound => None,
        Err(e) => {
            return Err(map_unitfile_io(
                "install_unit_file",
                "read unit file",
                &path,
                e,
            ));
        }
    };

    if let Some(existing) = existing
        && existing == contents
    {
        return Ok(false);
    }

    atomic_write(&path, contents)
        .map_err(|e| map_unitfile_io("install_unit_file", "write unit file", &path, e))?;
    Ok(true)
}

pub(crate) fn unit_file_path(dir: &Path, unit: &str) -> PathBuf {
    dir.join(unit)
}

fn validate_unit_file_name(unit: &str) -> Result<()> {
    crate::util::validate_no_control("unit", unit)?;
    let unit = unit.trim();
    if unit.is_empty() {
        return Err(Error::invalid_input("unit must not be empty"));
    }
    if unit.contains('/') || unit.contains('\\') {
        return Err(Error::invalid_input(
            "unit must not contain path separators",
        ));
    }
    if unit == "." || unit == ".." {
        return Err(Error::invalid_input(format!("unit must not be {unit:?}")));
    }
    Ok(())
}

fn atomic_write(path: &Path, contents: &[u8]) -> io::Result<()> {
    let dir = path
        .parent()
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "path has no parent"))?;

    let tmp_path = loop {
        let n = TMP_COUNTER.fetch_add(1, Ordering::Relaxed);
        let candidate = dir.join(format!(
            ".{}.tmp-{}-{}",
            path.file_name()
                .and_then(|s| s.to_str())
                .unwrap_or("unit.service"),
            std::process::id(),
            n
        ));
        if !candidate.exists() {
            break candidate;
        }
    };

    let mut file = open_new(&tmp_path)?;
    let written = file
        .write_all(contents)
        .and_then(|()| file.sync_all())
        .and_then(|()| fs::rename(&tmp_path, path));
    if let Err(e) = written {
        let _ = fs::remove_file(&tmp_path);
        return Err(e);
    }

    fsync_dir(dir)?;
    Ok(())
}

#[cfg(unix)]
fn open_new(path: &Path) -> io::Result<fs::File> {
    use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};

    let file = fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .mode(UNIT_FILE_MODE)
        .open(path)?;
    // umask may have stripped bits; systemd needs the unit world-readable.
    file.set_permissions(fs::Permissions::from_mode(UNIT_FILE_MODE))?;
    Ok(file)
}

#[cfg(not(unix))]
fn open_new(path: &Path) -> io::Result<fs::File> {
    fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
}

fn map_unitfile_io(action: &'static str, context: &'static str, path: &Path, e: io::Error) -> Error {
    if e.kind() == io::ErrorKind::PermissionDenied {
        return Error::PermissionDenied {
            action,
            detail: format!("{context} {}: {e}", path.to_string_lossy()),
        };
    }
    Error::IoError {
        context: format!("{context} {}: {e}", path.to_string_lossy()),
    }
}

#[cfg(unix)]
fn fsync_dir(dir: &Path) -> io::Result<()> {
    let f = fs::File::open(dir)?;
    f.sync_all()
}

#[cfg(not(unix))]
fn fsync_dir(_dir: &Path) -> io::Result<()> {
    Ok(())
}
