use crate::util::close::Close;
use crate::util::encoding::ICASE_NOPAD_ALPHANUMERIC_ENCODING;
use data_encoding::Encoding;
use fs2::FileExt;
use rand::RngCore;
use std::ffi::OsStr;
use std::fs::{File, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::{fs, io};

const TMP_FILE_SUFFIX_ENCODING: Encoding = ICASE_NOPAD_ALPHANUMERIC_ENCODING;
const TMP_FILE_SUFFIX_BYTES: usize = 4;
const TMP_FILE_SUFFIX_ENCODED_LEN: usize = 7;

/// A file that is staged to be atomically moved to a target path.
///
/// The file is created with a temporary name in the same directory as the target path.
/// Once [Close::close] is called, the file is moved to the target path. If the instance is
/// dropped without being closed, the temporary file is removed and the target stays untouched.
pub struct StagedFile<P: AsRef<Path>> {
    file: File,
    tmp_path: PathBuf,
    target_path: P,
    finalized: bool,
}

impl<P: AsRef<Path>> StagedFile<P> {
    pub fn new<R: RngCore>(target_path: P, rng: &mut R) -> io::Result<Self> {
        let mut bytes = [0; TMP_FILE_SUFFIX_BYTES];
        rng.fill_bytes(&mut bytes);
        Self::new_with_suffix(
            target_path,
            &TMP_FILE_SUFFIX_ENCODING.encode(bytes.as_ref()),
        )
    }

    fn new_with_suffix(target_path: P, suffix: &str) -> io::Result<Self> {
        let filename = target_path
            .as_ref()
            .file_name()
            .and_then(OsStr::to_str)
            .ok_or(io::Error::new(ErrorKind::InvalidInput, "Invalid filename"))?;
        let tmp_path = target_path
            .as_ref()
            .with_file_name(format!("{filename}.tmp.{suffix}"));
        for _ in 0..5 {
            let file = OpenOptions::new()
                .create_new(true)
                .write(true)
                .open(&tmp_path)?;
            file.lock_exclusive()?;
            if !tmp_path.exists() {
                // Removed by clean_leftover_tmp_files before the lock was acquired.
                continue;
            }
            return Ok(Self {
                file,
                tmp_path,
                target_path,
                finalized: false,
            });
        }
        Err(io::Error::other("Failed to create and lock temporary file"))
    }
}

impl<P: AsRef<Path>> Write for StagedFile<P> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.file.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.file.flush()
    }
}

impl<P: AsRef<Path>> Close for StagedFile<P> {
    fn close(mut self) -> io::Result<()> {
        self.file.flush()?;
        fs::rename(&self.tmp_path, self.target_path.as_ref())?;
        self.finalized = true;
        Ok(())
    }
}

impl<P: AsRef<Path>> Drop for StagedFile<P> {
    fn drop(&mut self) {
        if !self.finalized {
            let _ = fs::remove_file(&self.tmp_path);
        }
    }
}

/// Returns whether `file_name` names a temporary file of a [StagedFile].
pub fn is_tmp_file_name(file_name: &str) -> bool {
    let mut parts = file_name.rsplitn(3, '.');
    let suffix = parts.next();
    let ext = parts.next();
    ext == Some("tmp")
        && parts.next().is_some()
        && suffix.map(str::len) == Some(TMP_FILE_SUFFIX_ENCODED_LEN)
}

/// Removes leftover temporary files of [StagedFile] in the given directory.
///
/// Usually the temporary file is renamed or removed when the [StagedFile] is closed or dropped.
/// However, if a process is killed hard, the temporary file may be left behind. Files still
/// locked by a live writer are kept.
pub fn clean_leftover_tmp_files<P_: AsRef<Path>>(path: P_) -> io::Result<()> {
    for entry in path.as_ref().read_dir()? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        let is_tmp_file = entry.file_name().to_str().is_some_and(is_tmp_file_name);
        if is_tmp_file {
            let is_locked = OpenOptions::new()
                .read(true)
                .open(entry.path())
                .and_then(|file_handle| file_handle.try_lock_exclusive())
                .is_ok();
            if is_locked {
                fs::remove_file(entry.path())?;
            }
        }
    }
    Ok(())
}
