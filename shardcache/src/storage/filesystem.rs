//! Implementation of the `Storage` trait for storage in the local filesystem.

mod staged_file;

use crate::storage::filesystem::staged_file::{
    StagedFile, clean_leftover_tmp_files, is_tmp_file_name,
};
use crate::storage::{Storage, validate_name};
use std::fs::File;
use std::io::ErrorKind;
use std::path::PathBuf;
use std::{fs, io};

/// Storage implementation keeping every blob as a file in a single directory.
///
/// Multiple instances of this storage with the same root directory may be used in parallel.
/// Writes go to a temporary file next to the target which is renamed into place on close.
/// The root directory is never created by the storage itself.
///
/// # Examples
///
/// ```rust
/// # use std::io;
/// use std::io::{Read, Write};
/// use shardcache::storage::filesystem::FilesystemStorage;
/// use shardcache::storage::Storage;
/// use shardcache::util::close::Close;
///
/// # fn main() -> io::Result<()> {
/// # let root = std::env::temp_dir().join(format!("shardcache-doc-{}", std::process::id()));
/// # std::fs::create_dir_all(&root)?;
/// let storage = FilesystemStorage::new(root.clone());
/// let mut writer = storage.put("cache_1.rkyv")?;
/// writer.write_all(b"Hello, world!")?;
/// writer.close()?;
/// let mut buf = String::new();
/// storage.get("cache_1.rkyv")?.read_to_string(&mut buf)?;
/// assert_eq!(buf, "Hello, world!");
/// # std::fs::remove_dir_all(&root)?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct FilesystemStorage {
    root: PathBuf,
}

impl FilesystemStorage {
    /// Creates a new filesystem storage with the given root directory.
    pub fn new(root: PathBuf) -> Self {
        FilesystemStorage { root }
    }

    /// Cleans up leftover temporary files in the storage.
    ///
    /// The filesystem storage writes temporary files to ensure atomic writes. Usually these will
    /// be removed automatically when the writer is closed or dropped. However, if the process is
    /// killed hard, these files might be left behind. This method can be used to clean them up.
    pub fn clean_leftover_tmp_files(&self) -> io::Result<()> {
        clean_leftover_tmp_files(&self.root)
    }

    fn blob_path(&self, name: &str) -> io::Result<PathBuf> {
        validate_name(name)?;
        Ok(self.root.join(name))
    }
}

impl Storage for FilesystemStorage {
    type Reader = File;
    type Writer = StagedFile<PathBuf>;

    fn delete(&self, name: &str) -> io::Result<()> {
        fs::remove_file(self.blob_path(name)?)
    }

    fn exists(&self, name: &str) -> io::Result<bool> {
        match fs::metadata(self.blob_path(name)?) {
            Ok(metadata) => Ok(metadata.is_file()),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(false),
            Err(err) => Err(err),
        }
    }

    fn get(&self, name: &str) -> io::Result<Self::Reader> {
        File::open(self.blob_path(name)?)
    }

    fn list(&self) -> io::Result<impl Iterator<Item = io::Result<String>>> {
        Ok(self
            .root
            .read_dir()?
            .map(|entry| {
                let entry = entry?;
                if !entry.file_type()?.is_file() {
                    return Ok(None);
                }
                let name = entry.file_name().into_string().map_err(|_| {
                    io::Error::new(ErrorKind::InvalidData, "File name is not valid Unicode")
                })?;
                Ok(Some(name).filter(|name| !is_tmp_file_name(name)))
            })
            .filter_map(Result::transpose))
    }

    fn put(&self, name: &str) -> io::Result<Self::Writer> {
        StagedFile::new(self.blob_path(name)?, &mut rand::rng())
    }
}
