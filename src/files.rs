//! File/export collaborator: gated snippet write-out and project backups.
//!
//! `sudo` is an unrestricted write primitive in spirit; here every path must
//! resolve inside the configured write root, and anything absolute or
//! containing `..` is refused.

use anyhow::{anyhow, Context};
use chrono::Local;
use std::fs::{self, File};
use std::io;
use std::path::{Component, Path, PathBuf};
use zip::write::FileOptions;
use zip::ZipWriter;

use crate::errors::CommandError;
use crate::utils::ensure_dir;

/// Directories never included in a backup archive.
const BACKUP_SKIP: &[&str] = &["target", "node_modules", ".git", "logs"];

pub struct FileStore {
    write_root: PathBuf,
}

impl FileStore {
    pub fn new(write_root: &str) -> anyhow::Result<Self> {
        let root = PathBuf::from(write_root);
        ensure_dir(&root)?;
        Ok(Self { write_root: root })
    }

    /// Validate a user-supplied relative path against the write root.
    fn resolve(&self, path: &str) -> Result<PathBuf, CommandError> {
        let candidate = Path::new(path);
        for component in candidate.components() {
            match component {
                Component::Normal(_) | Component::CurDir => {}
                Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                    return Err(CommandError::Collaborator(anyhow!(
                        "refusing to write outside the project root: {}",
                        path
                    )));
                }
            }
        }
        Ok(self.write_root.join(candidate))
    }

    /// Write `content` to `path` under the write root, creating parent
    /// directories as needed. Returns the resolved path.
    pub fn write_file(&self, path: &str, content: &str) -> Result<PathBuf, CommandError> {
        let target = self.resolve(path)?;
        if let Some(parent) = target.parent() {
            ensure_dir(parent)?;
        }
        fs::write(&target, content)
            .with_context(|| format!("Failed to write {:?}", target))
            .map_err(CommandError::Collaborator)?;
        Ok(target)
    }

    /// Zip the write root into `project-backup-<timestamp>.zip` (placed in
    /// the root itself) and return the archive filename.
    pub fn create_backup(&self) -> Result<String, CommandError> {
        let timestamp = Local::now().format("%Y%m%d_%H%M%S");
        let filename = format!("project-backup-{}.zip", timestamp);
        let archive_path = self.write_root.join(&filename);

        let file = File::create(&archive_path)
            .with_context(|| format!("Failed to create {:?}", archive_path))
            .map_err(CommandError::Collaborator)?;
        let mut zip = ZipWriter::new(file);

        add_dir(&mut zip, &self.write_root, Path::new(""))
            .map_err(CommandError::Collaborator)?;

        zip.finish()
            .context("Failed to finalize backup archive")
            .map_err(CommandError::Collaborator)?;
        Ok(filename)
    }
}

fn add_dir(zip: &mut ZipWriter<File>, dir: &Path, prefix: &Path) -> anyhow::Result<()> {
    let mut entries: Vec<_> = fs::read_dir(dir)
        .with_context(|| format!("Failed to read {:?}", dir))?
        .filter_map(|e| e.ok())
        .collect();
    entries.sort_by_key(|e| e.file_name());

    for entry in entries {
        let name = entry.file_name();
        let name_str = name.to_string_lossy();
        let path = entry.path();
        let rel = prefix.join(&name);
        let rel_str = rel.to_string_lossy().replace('\\', "/");

        if path.is_dir() {
            if BACKUP_SKIP.contains(&name_str.as_ref()) {
                continue;
            }
            add_dir(zip, &path, &rel)?;
        } else {
            // Never archive previous backups into new ones.
            if name_str.starts_with("project-backup-") && name_str.ends_with(".zip") {
                continue;
            }
            zip.start_file(rel_str, FileOptions::default())?;
            let mut source = File::open(&path)
                .with_context(|| format!("Failed to open {:?}", path))?;
            io::copy(&mut source, zip)?;
        }
    }
    Ok(())
}
