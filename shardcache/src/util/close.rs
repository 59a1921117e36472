//! Provides the [Close] trait for writers whose output only becomes visible once finalized.

use std::io;

/// A writer that must be finalized explicitly.
///
/// Storage writers publish their content atomically: nothing written becomes visible until
/// [Close::close] returns successfully. Dropping a writer without closing it discards everything
/// written so far, so a failure halfway through encoding a shard can never publish a truncated
/// shard.
pub trait Close {
    /// Finalizes the write, making the written data visible as a whole.
    fn close(self) -> io::Result<()>;
}
