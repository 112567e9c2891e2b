//! Loading archives from and saving them to jar files or directories

use std::fs::{self, File};
use std::io::{BufReader, Read, Write};
use std::path::Path;

use walkdir::WalkDir;
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use super::{ArchiveReference, Entry};
use crate::error::Result;

impl ArchiveReference {
    /// Load a jar (zip) file or a directory tree
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if path.is_dir() {
            Self::open_dir(path)
        } else {
            Self::open_jar(path)
        }
    }

    pub fn open_jar(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        let mut zip = ZipArchive::new(BufReader::new(file))?;
        let mut archive = Self::new(path.display().to_string());
        for index in 0..zip.len() {
            let mut file = zip.by_index(index)?;
            if file.is_dir() {
                archive.insert(Entry::directory(file.name()));
                continue;
            }
            let mut bytes = Vec::with_capacity(file.size() as usize);
            file.read_to_end(&mut bytes)?;
            archive.insert(Entry::new(file.name(), bytes));
        }
        log::debug!("Loaded {} entries from jar {}", archive.len(), path.display());
        Ok(archive)
    }

    /// Every file under `root` becomes an entry named by its `/`-separated
    /// relative path; subdirectories become directory entries ending in `/`
    pub fn open_dir(root: &Path) -> Result<Self> {
        let mut archive = Self::new(root.display().to_string());
        for entry in WalkDir::new(root).min_depth(1).sort_by_file_name() {
            let entry = entry.map_err(std::io::Error::from)?;
            let relative = entry.path().strip_prefix(root).unwrap_or(entry.path());
            let name = relative
                .components()
                .map(|c| c.as_os_str().to_string_lossy().into_owned())
                .collect::<Vec<_>>()
                .join("/");
            if entry.file_type().is_dir() {
                archive.insert(Entry::directory(format!("{}/", name)));
            } else {
                archive.insert(Entry::new(name, fs::read(entry.path())?));
            }
        }
        log::debug!("Loaded {} entries from directory {}", archive.len(), root.display());
        Ok(archive)
    }

    /// Write a jar when `path` ends in `.jar`/`.zip`, a directory tree otherwise
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        match path.extension().and_then(|e| e.to_str()) {
            Some("jar" | "zip") => self.save_jar(path),
            _ => self.save_dir(path),
        }
    }

    pub fn save_jar(&self, path: &Path) -> Result<()> {
        let file = File::create(path)?;
        let mut writer = ZipWriter::new(file);
        let options = FileOptions::default().compression_method(CompressionMethod::Deflated);
        for entry in self.iter() {
            if entry.is_directory {
                writer.add_directory(entry.name.as_str(), options)?;
            } else {
                writer.start_file(entry.name.as_str(), options)?;
                writer.write_all(&entry.bytes)?;
            }
        }
        writer.finish()?;
        log::debug!("Wrote {} entries to jar {}", self.len(), path.display());
        Ok(())
    }

    pub fn save_dir(&self, root: &Path) -> Result<()> {
        fs::create_dir_all(root)?;
        for entry in self.iter() {
            let target = root.join(entry.name.trim_end_matches('/'));
            if entry.is_directory {
                fs::create_dir_all(&target)?;
                continue;
            }
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::write(&target, &entry.bytes)?;
        }
        log::debug!("Wrote {} entries to directory {}", self.len(), root.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn sample() -> ArchiveReference {
        let mut archive = ArchiveReference::new("sample");
        archive.insert(Entry::directory("a/"));
        archive.insert(Entry::new("a/B.class", vec![0xCA, 0xFE]));
        archive.insert(Entry::new("META-INF/MANIFEST.MF", b"Manifest-Version: 1.0\n".to_vec()));
        archive
    }

    #[test]
    fn test_jar_save_and_open() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.jar");
        sample().save(&path).unwrap();

        let loaded = ArchiveReference::open(&path).unwrap();
        assert_eq!(loaded.get("a/B.class").unwrap().bytes.as_ref(), &[0xCA, 0xFE]);
        assert!(loaded.get("a/").unwrap().is_directory);
        assert!(loaded.contains("META-INF/MANIFEST.MF"));
    }

    #[test]
    fn test_directory_save_and_open() {
        let dir = TempDir::new().unwrap();
        let root = dir.path().join("classes");
        sample().save(&root).unwrap();
        assert!(root.join("a").join("B.class").is_file());

        let loaded = ArchiveReference::open(&root).unwrap();
        assert_eq!(loaded.get("a/B.class").unwrap().bytes.as_ref(), &[0xCA, 0xFE]);
        assert!(loaded.get("a/").unwrap().is_directory);
        assert!(loaded.get("META-INF/").unwrap().is_directory);
    }

    #[test]
    fn test_open_missing_path_is_io_error() {
        let dir = TempDir::new().unwrap();
        let result = ArchiveReference::open(dir.path().join("missing.jar"));
        assert!(matches!(result, Err(crate::error::Error::Io(_))));
    }
}
