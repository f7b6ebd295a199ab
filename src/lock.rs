use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::warn;

pub(crate) fn rw_read<'a, T>(
    lock: &'a RwLock<T>,
    target: &'static str,
    op: &'static str,
) -> RwLockReadGuard<'a, T> {
    match lock.read() {
        Ok(guard) => guard,
        Err(poisoned) => {
            warn!(
                op,
                target_module = target,
                lock_kind = "rwlock.read",
                result = "poisoned_recovered",
                "Recovered from poisoned {target} lock"
            );
            poisoned.into_inner()
        }
    }
}

pub(crate) fn rw_write<'a, T>(
    lock: &'a RwLock<T>,
    target: &'static str,
    op: &'static str,
) -> RwLockWriteGuard<'a, T> {
    match lock.write() {
        Ok(guard) => guard,
        Err(poisoned) => {
            warn!(
                op,
                target_module = target,
                lock_kind = "rwlock.write",
                result = "poisoned_recovered",
                "Recovered from poisoned {target} lock"
            );
            poisoned.into_inner()
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::thread;

    use super::*;

    fn poisoned(value: u32) -> Arc<RwLock<u32>> {
        let lock = Arc::new(RwLock::new(value));
        let held = Arc::clone(&lock);
        let _ = thread::spawn(move || {
            let _guard = held.write().expect("fresh lock");
            panic!("poison the lock");
        })
        .join();
        assert!(lock.is_poisoned());
        lock
    }

    #[test]
    fn read_recovers_value_from_poisoned_lock() {
        let lock = poisoned(7);
        assert_eq!(*rw_read(&lock, "session", "current"), 7);
    }

    #[test]
    fn write_recovers_and_keeps_working() {
        let lock = poisoned(1);
        *rw_write(&lock, "collection", "fetch") = 2;
        assert_eq!(*rw_read(&lock, "collection", "snapshot"), 2);
    }
}
