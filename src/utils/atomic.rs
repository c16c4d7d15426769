//! Crash-safe file replacement for the journal snapshot
//!
//! The snapshot is written to `<name>.tmp`, synced, then renamed over the
//! live file, so a reader only ever sees the previous or the new snapshot.

use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::Path;

/// Replace `path` with whatever `write_fn` produces
pub fn replace_with<P, F>(path: P, write_fn: F) -> io::Result<()>
where
    P: AsRef<Path>,
    F: FnOnce(&mut BufWriter<File>) -> io::Result<()>,
{
    let path = path.as_ref();
    let temp_path = path.with_extension("tmp");

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let mut writer = BufWriter::new(File::create(&temp_path)?);
    write_fn(&mut writer)?;
    writer.flush()?;
    writer.get_ref().sync_all()?;

    fs::rename(&temp_path, path)
}

/// Remove `.tmp` leftovers of an interrupted replacement
pub fn remove_stale_temp_files<P: AsRef<Path>>(dir: P) -> io::Result<usize> {
    let dir = dir.as_ref();
    if !dir.exists() {
        return Ok(0);
    }

    let mut removed = 0;
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.extension().is_some_and(|ext| ext == "tmp") {
            fs::remove_file(&path)?;
            removed += 1;
        }
    }
    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_replace_with_writes_and_cleans_temp() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested").join("state.jsonl");

        replace_with(&path, |file| {
            writeln!(file, "first")?;
            writeln!(file, "second")
        })
        .unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "first\nsecond\n");
        assert!(!path.with_extension("tmp").exists());
    }

    #[test]
    fn test_replace_with_overwrites_previous() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("state.jsonl");

        replace_with(&path, |file| writeln!(file, "old")).unwrap();
        replace_with(&path, |file| writeln!(file, "new")).unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "new\n");
    }

    #[test]
    fn test_remove_stale_temp_files() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("state.tmp"), "partial").unwrap();
        fs::write(temp_dir.path().join("hits.jsonl"), "keep").unwrap();

        assert_eq!(remove_stale_temp_files(temp_dir.path()).unwrap(), 1);
        assert!(temp_dir.path().join("hits.jsonl").exists());
        assert_eq!(remove_stale_temp_files(temp_dir.path().join("missing")).unwrap(), 0);
    }
}
