//! A storage is a place where shard files are kept, for example a directory in the local
//! filesystem.
//!
//! This module defines the `Storage` trait and provides implementations of it in its submodules.

pub mod filesystem;
pub mod in_memory;

use crate::util::close::Close;
use std::io;
use std::io::{ErrorKind, Read, Write};

/// A flat namespace of named blobs, the content store of the cache.
///
/// Names are plain file names: they must be non-empty, must not be `.` or `..`, and must not
/// contain path separators.
///
/// For reading and writing blobs, a [Storage::Reader] and [Storage::Writer] are returned,
/// respectively. A written blob must become available atomically, thus the `Writer` must
/// implement [Close] to finalize the write operation. Dropping a writer without closing it must
/// leave the previous content (or absence) of the blob untouched.
///
/// Several caches may share one storage (for example, two processes pointed at the same
/// directory). Implementations must therefore keep every single `put` and `delete` atomic, while
/// sequences of calls carry no guarantee.
pub trait Storage {
    /// The type of reader returned by this storage.
    type Reader: Read;

    /// The type of writer returned by this storage.
    type Writer: Write + Close;

    /// Deletes the blob with the given name.
    ///
    /// Fails with [ErrorKind::NotFound] if there is no such blob.
    fn delete(&self, name: &str) -> io::Result<()>;

    /// Checks whether a blob with the given name exists.
    ///
    /// Only a missing blob yields `false`; failing to find out is an error.
    fn exists(&self, name: &str) -> io::Result<bool>;

    /// Returns a reader for the blob with the given name.
    fn get(&self, name: &str) -> io::Result<Self::Reader>;

    /// Returns the names of all blobs in the storage.
    fn list(&self) -> io::Result<impl Iterator<Item = io::Result<String>>>;

    /// Returns a writer replacing the blob with the given name.
    ///
    /// The new content becomes visible atomically once [Close::close] is called on the writer.
    fn put(&self, name: &str) -> io::Result<Self::Writer>;
}

/// Checks that `name` is a valid blob name.
pub(crate) fn validate_name(name: &str) -> io::Result<()> {
    if name.is_empty() || name == "." || name == ".." || name.contains(['/', '\\']) {
        return Err(io::Error::new(
            ErrorKind::InvalidInput,
            format!("Invalid blob name {name:?}"),
        ));
    }
    Ok(())
}

/// Reads the complete content of a blob.
pub fn read_to_vec(storage: &impl Storage, name: &str) -> io::Result<Vec<u8>> {
    let mut buf = Vec::new();
    storage.get(name)?.read_to_end(&mut buf)?;
    Ok(buf)
}

/// Atomically replaces the content of a blob with `content`.
pub fn write_all(storage: &impl Storage, name: &str, content: &[u8]) -> io::Result<()> {
    let mut writer = storage.put(name)?;
    writer.write_all(content)?;
    writer.close()
}
