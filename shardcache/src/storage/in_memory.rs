//! Implementation of the `Storage` trait for an in-memory storage.

use crate::storage::{Storage, validate_name};
use crate::util::close::Close;
use std::collections::BTreeMap;
use std::io;
use std::io::{Cursor, ErrorKind, Write};
use std::sync::{Arc, PoisonError, RwLock};

type Blobs = BTreeMap<String, Arc<[u8]>>;

/// In-memory storage implementation.
///
/// This implementation is mainly intended for testing purposes. Clones share the same blobs,
/// which allows pointing several caches at the same storage.
///
/// # Examples
///
/// ```rust
/// # use std::io;
/// use std::io::{Read, Write};
/// use shardcache::storage::in_memory::InMemoryStorage;
/// use shardcache::storage::Storage;
/// use shardcache::util::close::Close;
///
/// # fn main() -> io::Result<()> {
/// let storage = InMemoryStorage::new();
/// let mut writer = storage.put("cache_1.rkyv")?;
/// writer.write_all(b"Hello, world!")?;
/// writer.close()?;
/// let mut buf = String::new();
/// storage.get("cache_1.rkyv")?.read_to_string(&mut buf)?;
/// assert_eq!(buf, "Hello, world!");
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug, Default)]
pub struct InMemoryStorage {
    blobs: Arc<RwLock<Blobs>>,
}

impl InMemoryStorage {
    /// Creates a new, empty in-memory storage.
    pub fn new() -> Self {
        Self::default()
    }
}

impl Storage for InMemoryStorage {
    type Reader = Cursor<Arc<[u8]>>;
    type Writer = BlobWriter;

    fn delete(&self, name: &str) -> io::Result<()> {
        validate_name(name)?;
        let mut blobs = self.blobs.write().unwrap_or_else(PoisonError::into_inner);
        match blobs.remove(name) {
            Some(_) => Ok(()),
            None => Err(io::Error::new(ErrorKind::NotFound, "No such blob")),
        }
    }

    fn exists(&self, name: &str) -> io::Result<bool> {
        validate_name(name)?;
        let blobs = self.blobs.read().unwrap_or_else(PoisonError::into_inner);
        Ok(blobs.contains_key(name))
    }

    fn get(&self, name: &str) -> io::Result<Self::Reader> {
        validate_name(name)?;
        let blobs = self.blobs.read().unwrap_or_else(PoisonError::into_inner);
        blobs
            .get(name)
            .map(|content| Cursor::new(Arc::clone(content)))
            .ok_or_else(|| io::Error::new(ErrorKind::NotFound, "No such blob"))
    }

    fn list(&self) -> io::Result<impl Iterator<Item = io::Result<String>>> {
        let blobs = self.blobs.read().unwrap_or_else(PoisonError::into_inner);
        Ok(blobs.keys().cloned().map(Ok).collect::<Vec<_>>().into_iter())
    }

    fn put(&self, name: &str) -> io::Result<Self::Writer> {
        validate_name(name)?;
        Ok(BlobWriter {
            blobs: Arc::clone(&self.blobs),
            name: name.to_string(),
            buf: Vec::new(),
        })
    }
}

/// Buffers written data and publishes it as a whole on [Close::close].
#[derive(Debug)]
pub struct BlobWriter {
    blobs: Arc<RwLock<Blobs>>,
    name: String,
    buf: Vec<u8>,
}

impl Write for BlobWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.buf.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Close for BlobWriter {
    fn close(self) -> io::Result<()> {
        let mut blobs = self.blobs.write().unwrap_or_else(PoisonError::into_inner);
        blobs.insert(self.name, self.buf.into());
        Ok(())
    }
}
