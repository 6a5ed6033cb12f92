//! Reentrant open/close with a drop guard.
//!
//! Every resource owner in this crate keeps a nesting depth: `open` increments it
//! and only the first call touches the OS, `close` decrements it and only the
//! last call releases. [`Scoped`] ties one open/close pair to a lexical scope so
//! the depth is restored on every exit path, including `?` and panics.

use std::ops::{Deref, DerefMut};

use crate::Result;

/// A resource with reference-counted open/close.
pub trait Scope {
    /// Increments the nesting depth, acquiring the resource on 0 -> 1.
    fn open(&mut self) -> Result<()>;

    /// Decrements the nesting depth, releasing the resource on 1 -> 0.
    /// Closing an already closed resource is a no-op.
    fn close(&mut self);

    fn is_open(&self) -> bool;

    /// Opens the resource for the lifetime of the returned guard.
    fn scoped(&mut self) -> Result<Scoped<'_, Self>>
    where
        Self: Sized,
    {
        self.open()?;
        Ok(Scoped { inner: self })
    }
}

/// Guard returned by [`Scope::scoped`]. Dereferences to the resource, so scopes
/// nest by calling `scoped()` on the guard itself.
#[must_use = "the resource is closed again as soon as the guard is dropped"]
pub struct Scoped<'a, T: Scope> {
    inner: &'a mut T,
}

impl<T: Scope> Deref for Scoped<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        self.inner
    }
}

impl<T: Scope> DerefMut for Scoped<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        self.inner
    }
}

impl<T: Scope> Drop for Scoped<'_, T> {
    fn drop(&mut self) {
        self.inner.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;

    #[derive(Default)]
    struct Counter {
        depth: usize,
        acquired: usize,
        fail: bool,
    }

    impl Scope for Counter {
        fn open(&mut self) -> Result<()> {
            if self.fail {
                return Err(Error::InvalidArgument("refused".into()));
            }
            if self.depth == 0 {
                self.acquired += 1;
            }
            self.depth += 1;
            Ok(())
        }

        fn close(&mut self) {
            self.depth = self.depth.saturating_sub(1);
        }

        fn is_open(&self) -> bool {
            self.depth > 0
        }
    }

    #[test]
    fn test_nested_guards_share_one_acquisition() {
        let mut counter = Counter::default();
        {
            let mut outer = counter.scoped().unwrap();
            {
                let inner = outer.scoped().unwrap();
                assert_eq!(inner.depth, 2);
            }
            assert!(outer.is_open());
            assert_eq!(outer.depth, 1);
        }
        assert!(!counter.is_open());
        assert_eq!(counter.acquired, 1);
    }

    #[test]
    fn test_guard_restores_depth_on_error_path() {
        fn fails_inside(counter: &mut Counter) -> Result<()> {
            let _guard = counter.scoped()?;
            Err(Error::InvalidArgument("boom".into()))
        }

        let mut counter = Counter::default();
        counter.open().unwrap();
        assert!(fails_inside(&mut counter).is_err());
        assert_eq!(counter.depth, 1);
    }

    #[test]
    fn test_failed_open_leaves_depth_untouched() {
        let mut counter = Counter { fail: true, ..Default::default() };
        assert!(counter.scoped().is_err());
        assert_eq!(counter.depth, 0);
    }
}
