//! Scoped ownership of listeners, animation-frame requests and timers.
//!
//! Everything a mounted player registers with its host is acquired through a
//! [`HandleScope`] together with the code that releases it. Disposing the
//! scope (explicitly or on drop) releases every handle still held, in reverse
//! order of acquisition.

struct Handle {
    label: &'static str,
    release: Box<dyn FnOnce()>,
}

/// Owner of disposable handles.
///
/// ## Example
///
/// ```rust
/// use std::cell::Cell;
/// use std::rc::Rc;
/// use frameseq_scroll::HandleScope;
///
/// let released = Rc::new(Cell::new(0));
/// {
///     let mut scope = HandleScope::new();
///     let r = released.clone();
///     scope.acquire("resize listener", move || r.set(r.get() + 1));
/// }
/// assert_eq!(released.get(), 1);
/// ```
#[derive(Default)]
pub struct HandleScope {
    handles: Vec<Handle>,
    disposed: bool,
}

impl std::fmt::Debug for HandleScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandleScope")
            .field("handles", &self.handles.iter().map(|h| h.label).collect::<Vec<_>>())
            .field("disposed", &self.disposed)
            .finish()
    }
}

impl HandleScope {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handle with its release action.
    ///
    /// On a disposed scope the release action runs immediately, so nothing
    /// outlives the scope.
    pub fn acquire<F>(&mut self, label: &'static str, release: F)
    where
        F: FnOnce() + 'static,
    {
        if self.disposed {
            tracing::debug!(label, "handle acquired after dispose, releasing");
            release();
        } else {
            self.handles.push(Handle {
                label,
                release: Box::new(release),
            });
        }
    }

    /// Number of handles still held.
    #[inline]
    pub fn len(&self) -> usize {
        self.handles.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    #[inline]
    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    /// Release everything, newest first.
    pub fn dispose(&mut self) {
        if !self.handles.is_empty() {
            tracing::debug!(count = self.handles.len(), "releasing scoped handles");
        }
        self.disposed = true;
        while let Some(handle) = self.handles.pop() {
            (handle.release)();
        }
    }
}

impl Drop for HandleScope {
    fn drop(&mut self) {
        self.dispose();
    }
}
