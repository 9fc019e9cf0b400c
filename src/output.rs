//! Output file handling
//!
//! Results are written to a temporary file next to the destination and
//! renamed into place only once writing succeeded. A failed run never leaves
//! a truncated file behind, and an existing file at the destination is only
//! replaced by a complete one.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

/// Directory that will hold `path`, creating it if needed.
fn prepare_parent(path: &Path) -> io::Result<PathBuf> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    if !parent.exists() {
        std::fs::create_dir_all(&parent)?;
    }
    Ok(parent)
}

/// Write a file atomically.
///
/// `write` receives a buffered writer over a temporary file in the same
/// directory as `path`. If it returns an error the temporary file is removed
/// and `path` is left untouched.
///
/// # Arguments
///
/// * `path` - Final destination
/// * `write` - Fills the temporary file
pub fn write_atomic<E, F>(path: &Path, write: F) -> Result<(), E>
where
    E: From<io::Error>,
    F: FnOnce(&mut BufWriter<&File>) -> Result<(), E>,
{
    let dir = prepare_parent(path)?;
    let temp = tempfile::Builder::new().prefix(".picframe-").suffix(".part").tempfile_in(dir)?;

    {
        let mut writer = BufWriter::new(temp.as_file());
        write(&mut writer)?;
        writer.flush()?;
    }
    temp.as_file().sync_all()?;
    temp.persist(path).map_err(|e| e.error)?;

    tracing::debug!(path = %path.display(), "wrote output");
    Ok(())
}

/// Write text atomically.
pub fn write_text(path: &Path, text: &str) -> io::Result<()> {
    write_atomic(path, |w| w.write_all(text.as_bytes()))
}
