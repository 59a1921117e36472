//! A [Storage] wrapper observing and disturbing the calls made to it.

use crate::storage::Storage;
use std::cell::Cell;
use std::io;
use std::io::ErrorKind;
use std::rc::Rc;

#[derive(Debug, Default)]
struct Counters {
    reads: Cell<usize>,
    writes: Cell<usize>,
    deletes: Cell<usize>,
    fail_reads: Cell<bool>,
    /// Remaining `put` calls allowed to succeed; `None` is unlimited.
    write_budget: Cell<Option<usize>>,
}

/// Wraps a storage, counting blob reads, writes and deletes, and optionally failing them.
///
/// Clones share their counters and failure switches.
#[derive(Debug, Clone)]
pub struct InstrumentedStorage<S> {
    inner: S,
    counters: Rc<Counters>,
}

impl<S: Storage> InstrumentedStorage<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            counters: Rc::default(),
        }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    /// Number of blob contents read with [Storage::get].
    pub fn reads(&self) -> usize {
        self.counters.reads.get()
    }

    /// Number of blob writes started with [Storage::put].
    pub fn writes(&self) -> usize {
        self.counters.writes.get()
    }

    /// Number of blobs deleted.
    pub fn deletes(&self) -> usize {
        self.counters.deletes.get()
    }

    /// Makes every subsequent `exists`, `get` and `list` fail.
    pub fn fail_reads(&self, fail: bool) {
        self.counters.fail_reads.set(fail);
    }

    /// Makes every subsequent `put` and `delete` fail.
    pub fn fail_writes(&self, fail: bool) {
        self.counters.write_budget.set(fail.then_some(0));
    }

    /// Lets the next `writes` calls to `put` succeed and fails every `put` and `delete` after
    /// that.
    pub fn fail_writes_after(&self, writes: usize) {
        self.counters.write_budget.set(Some(writes));
    }

    fn check_read(&self) -> io::Result<()> {
        if self.counters.fail_reads.get() {
            return Err(io::Error::new(ErrorKind::PermissionDenied, "reads disabled"));
        }
        Ok(())
    }

    fn check_write(&self) -> io::Result<()> {
        if self.counters.write_budget.get() == Some(0) {
            return Err(io::Error::new(ErrorKind::PermissionDenied, "writes disabled"));
        }
        Ok(())
    }
}

impl<S: Storage> Storage for InstrumentedStorage<S> {
    type Reader = S::Reader;
    type Writer = S::Writer;

    fn delete(&self, name: &str) -> io::Result<()> {
        self.check_write()?;
        self.inner.delete(name)?;
        self.counters.deletes.set(self.counters.deletes.get() + 1);
        Ok(())
    }

    fn exists(&self, name: &str) -> io::Result<bool> {
        self.check_read()?;
        self.inner.exists(name)
    }

    fn get(&self, name: &str) -> io::Result<Self::Reader> {
        self.check_read()?;
        let reader = self.inner.get(name)?;
        self.counters.reads.set(self.counters.reads.get() + 1);
        Ok(reader)
    }

    fn list(&self) -> io::Result<impl Iterator<Item = io::Result<String>>> {
        self.check_read()?;
        self.inner.list()
    }

    fn put(&self, name: &str) -> io::Result<Self::Writer> {
        self.check_write()?;
        let writer = self.inner.put(name)?;
        if let Some(budget) = self.counters.write_budget.get() {
            self.counters.write_budget.set(Some(budget - 1));
        }
        self.counters.writes.set(self.counters.writes.get() + 1);
        Ok(writer)
    }
}
