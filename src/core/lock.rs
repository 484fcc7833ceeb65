//! Advisory file locking for the shared document.
//!
//! The lock artifact is a sibling file next to the document. Every store
//! operation holds it for one full load-modify-write (or load-read) cycle:
//! shared mode admits concurrent readers, exclusive mode admits one writer.
//! The lock is advisory: it only arbitrates between callers that go through
//! this module. A holder that crashes with the file descriptor open can
//! starve everyone else; there is no lease or expiry.

use crate::core::error::ShoalError;
use std::fs::{File, OpenOptions, TryLockError};
use std::path::Path;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

/// How long a caller is willing to wait for the document lock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LockPolicy {
    /// Block until the lock is granted, with no deadline.
    #[default]
    Block,
    /// Poll with jittered sleeps and give up after this many milliseconds.
    TimeoutMs(u64),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockMode {
    Shared,
    Exclusive,
}

/// A held lock on the document's lock artifact. Released on drop.
///
/// The lock file itself is left in place; only the flock is dropped. Removing
/// the file would race against other processes opening it.
pub struct LockGuard {
    file: File,
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        let _ = self.file.unlock();
    }
}

pub fn acquire(
    lock_path: &Path,
    mode: LockMode,
    policy: LockPolicy,
) -> Result<LockGuard, ShoalError> {
    let file = OpenOptions::new()
        .create(true)
        .read(true)
        .write(true)
        .truncate(false)
        .open(lock_path)?;

    match policy {
        LockPolicy::Block => match mode {
            LockMode::Exclusive => file.lock()?,
            LockMode::Shared => file.lock_shared()?,
        },
        LockPolicy::TimeoutMs(ms) => {
            let deadline = Instant::now() + Duration::from_millis(ms);
            loop {
                let attempt = match mode {
                    LockMode::Exclusive => file.try_lock(),
                    LockMode::Shared => file.try_lock_shared(),
                };
                match attempt {
                    Ok(()) => break,
                    Err(TryLockError::WouldBlock) => {
                        if Instant::now() >= deadline {
                            return Err(ShoalError::LockTimeout(ms));
                        }
                        std::thread::sleep(Duration::from_millis(5 + jitter_ms(20)));
                    }
                    Err(TryLockError::Error(err)) => return Err(ShoalError::IoError(err)),
                }
            }
        }
    }

    Ok(LockGuard { file })
}

fn jitter_ms(max_exclusive: u64) -> u64 {
    if max_exclusive <= 1 {
        return 0;
    }
    let now_ms = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64;
    now_ms % max_exclusive
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exclusive_blocks_second_exclusive() {
        let tmp = tempfile::tempdir().unwrap();
        let lock_path = tmp.path().join("doc.lock");

        let guard = acquire(&lock_path, LockMode::Exclusive, LockPolicy::Block).unwrap();
        let second = acquire(&lock_path, LockMode::Exclusive, LockPolicy::TimeoutMs(60));
        assert!(matches!(second, Err(ShoalError::LockTimeout(60))));

        drop(guard);
        let third = acquire(&lock_path, LockMode::Exclusive, LockPolicy::TimeoutMs(60));
        assert!(third.is_ok());
    }

    #[test]
    fn test_shared_locks_coexist() {
        let tmp = tempfile::tempdir().unwrap();
        let lock_path = tmp.path().join("doc.lock");

        let first = acquire(&lock_path, LockMode::Shared, LockPolicy::Block).unwrap();
        let second = acquire(&lock_path, LockMode::Shared, LockPolicy::TimeoutMs(60));
        assert!(second.is_ok());
        drop(first);
    }

    #[test]
    fn test_shared_excludes_exclusive() {
        let tmp = tempfile::tempdir().unwrap();
        let lock_path = tmp.path().join("doc.lock");

        let reader = acquire(&lock_path, LockMode::Shared, LockPolicy::Block).unwrap();
        let writer = acquire(&lock_path, LockMode::Exclusive, LockPolicy::TimeoutMs(60));
        assert!(matches!(writer, Err(ShoalError::LockTimeout(_))));
        drop(reader);
    }

    #[test]
    fn test_lock_file_left_in_place_after_release() {
        let tmp = tempfile::tempdir().unwrap();
        let lock_path = tmp.path().join("doc.lock");

        let guard = acquire(&lock_path, LockMode::Exclusive, LockPolicy::Block).unwrap();
        drop(guard);
        assert!(lock_path.exists());
    }
}
