use std::cell::Cell;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use thiserror::Error;

/// Identity of a rendering context.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct ContextId(u64);

impl ContextId {
    /// Allocates a process-unique id.
    pub fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for ContextId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ctx#{}", self.0)
    }
}

#[derive(Debug, Error)]
pub enum ContextError {
    #[error("cannot make {requested} current: {current} is still current on this thread")]
    AlreadyCurrent {
        requested: ContextId,
        current: ContextId,
    },

    #[error("cannot release {0}: it is not current on this thread")]
    NotCurrent(ContextId),

    #[error("context unavailable: {0}")]
    Unavailable(String),
}

thread_local! {
    static CURRENT: Cell<Option<ContextId>> = const { Cell::new(None) };
}

/// The context current on the calling thread, if any.
pub fn current() -> Option<ContextId> {
    CURRENT.with(Cell::get)
}

/// Records `id` as current on this thread.
///
/// Fails if a different context is current; re-claiming the same context is
/// allowed.
pub fn claim(id: ContextId) -> Result<(), ContextError> {
    CURRENT.with(|cur| match cur.get() {
        Some(other) if other != id => Err(ContextError::AlreadyCurrent {
            requested: id,
            current: other,
        }),
        _ => {
            cur.set(Some(id));
            Ok(())
        }
    })
}

/// Clears `id` as the current context on this thread.
pub fn relinquish(id: ContextId) -> Result<(), ContextError> {
    CURRENT.with(|cur| {
        if cur.get() == Some(id) {
            cur.set(None);
            Ok(())
        } else {
            Err(ContextError::NotCurrent(id))
        }
    })
}

/// A rendering context that can be made current on the calling thread.
///
/// At most one context may be current per thread. Contexts created with
/// [`create_shared`](Self::create_shared) share device objects (textures,
/// buffers) with their parent.
pub trait GlContext: fmt::Debug + Send + Sync {
    fn id(&self) -> ContextId;

    fn make_current(&self) -> Result<(), ContextError>;

    fn release(&self) -> Result<(), ContextError>;

    /// Creates a new context sharing objects with this one.
    fn create_shared(&self) -> Result<Box<dyn GlContext>, ContextError>;
}

/// Context whose only state is the thread-local current marker.
///
/// Backends without a native notion of a current context (wgpu) use this to
/// keep the single-current-context discipline checkable.
#[derive(Debug)]
pub struct TrackedContext {
    id: ContextId,
}

impl TrackedContext {
    pub fn new() -> Self {
        Self { id: ContextId::next() }
    }
}

impl Default for TrackedContext {
    fn default() -> Self {
        Self::new()
    }
}

impl GlContext for TrackedContext {
    fn id(&self) -> ContextId {
        self.id
    }

    fn make_current(&self) -> Result<(), ContextError> {
        claim(self.id)
    }

    fn release(&self) -> Result<(), ContextError> {
        relinquish(self.id)
    }

    fn create_shared(&self) -> Result<Box<dyn GlContext>, ContextError> {
        Ok(Box::new(TrackedContext::new()))
    }
}

/// Offscreen context switch that restores the onscreen context on exit.
///
/// Entering releases the onscreen context before the offscreen one is made
/// current, so the two are never current together. Call [`exit`](Self::exit)
/// to restore and observe restore failures; dropping an un-exited scope
/// (early return, panic) restores best-effort and logs failures.
#[must_use = "dropping the scope immediately switches back to the onscreen context"]
pub struct ContextScope<'a> {
    onscreen: &'a dyn GlContext,
    offscreen: &'a dyn GlContext,
    active: bool,
}

impl<'a> ContextScope<'a> {
    pub fn enter(
        onscreen: &'a dyn GlContext,
        offscreen: &'a dyn GlContext,
    ) -> Result<Self, ContextError> {
        onscreen.release()?;

        if let Err(err) = offscreen.make_current() {
            if let Err(restore) = onscreen.make_current() {
                log::error!("failed to restore {} after switch failure: {restore}", onscreen.id());
            }
            return Err(err);
        }

        log::trace!("context switch {} -> {}", onscreen.id(), offscreen.id());

        Ok(Self {
            onscreen,
            offscreen,
            active: true,
        })
    }

    /// Switches back to the onscreen context.
    ///
    /// The onscreen context is re-acquired even if releasing the offscreen
    /// one fails; the first failure is returned.
    pub fn exit(mut self) -> Result<(), ContextError> {
        self.restore()
    }

    fn restore(&mut self) -> Result<(), ContextError> {
        if !self.active {
            return Ok(());
        }
        self.active = false;

        let released = self.offscreen.release();
        let reacquired = self.onscreen.make_current();

        log::trace!("context switch {} -> {}", self.offscreen.id(), self.onscreen.id());

        released.and(reacquired)
    }
}

impl Drop for ContextScope<'_> {
    fn drop(&mut self) {
        if let Err(err) = self.restore() {
            log::error!("failed to restore onscreen context: {err}");
        }
    }
}

/// Runs `body` with `offscreen` current, then restores `onscreen`.
///
/// A body error takes precedence over a restore error (the latter is
/// logged); otherwise a restore error is returned.
pub fn with_offscreen<T, E>(
    onscreen: &dyn GlContext,
    offscreen: &dyn GlContext,
    body: impl FnOnce() -> Result<T, E>,
) -> Result<T, E>
where
    E: From<ContextError>,
{
    let scope = ContextScope::enter(onscreen, offscreen)?;
    let result = body();
    let restored = scope.exit();

    match (result, restored) {
        (Ok(value), Ok(())) => Ok(value),
        (Ok(_), Err(err)) => Err(err.into()),
        (Err(err), Ok(())) => Err(err),
        (Err(err), Err(restore)) => {
            log::error!("failed to restore onscreen context: {restore}");
            Err(err)
        }
    }
}

/// Runs `body` with `context` current on an otherwise idle thread.
pub fn with_current<T, E>(context: &dyn GlContext, body: impl FnOnce() -> Result<T, E>) -> Result<T, E>
where
    E: From<ContextError>,
{
    context.make_current()?;
    let result = body();
    let released = context.release();

    match (result, released) {
        (Ok(value), Ok(())) => Ok(value),
        (Ok(_), Err(err)) => Err(err.into()),
        (Err(err), Ok(())) => Err(err),
        (Err(err), Err(release)) => {
            log::error!("failed to release {}: {release}", context.id());
            Err(err)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Context whose `make_current` can be made to fail.
    #[derive(Debug)]
    struct Flaky {
        inner: TrackedContext,
        fail_make_current: bool,
    }

    impl GlContext for Flaky {
        fn id(&self) -> ContextId {
            self.inner.id()
        }
        fn make_current(&self) -> Result<(), ContextError> {
            if self.fail_make_current {
                return Err(ContextError::Unavailable("lost".into()));
            }
            self.inner.make_current()
        }
        fn release(&self) -> Result<(), ContextError> {
            self.inner.release()
        }
        fn create_shared(&self) -> Result<Box<dyn GlContext>, ContextError> {
            self.inner.create_shared()
        }
    }

    // ── bookkeeping ───────────────────────────────────────────────────────

    #[test]
    fn two_contexts_cannot_be_current_together() {
        let a = TrackedContext::new();
        let b = TrackedContext::new();
        a.make_current().unwrap();
        assert!(matches!(b.make_current(), Err(ContextError::AlreadyCurrent { .. })));
        a.release().unwrap();
        b.make_current().unwrap();
        b.release().unwrap();
        assert_eq!(current(), None);
    }

    #[test]
    fn releasing_a_non_current_context_fails() {
        let a = TrackedContext::new();
        assert!(matches!(a.release(), Err(ContextError::NotCurrent(_))));
    }

    // ── ContextScope ──────────────────────────────────────────────────────

    #[test]
    fn scope_switches_and_restores() {
        let on = TrackedContext::new();
        let off = on.create_shared().unwrap();
        on.make_current().unwrap();

        let scope = ContextScope::enter(&on, off.as_ref()).unwrap();
        assert_eq!(current(), Some(off.id()));
        scope.exit().unwrap();

        assert_eq!(current(), Some(on.id()));
        on.release().unwrap();
    }

    #[test]
    fn dropped_scope_restores_onscreen() {
        let on = TrackedContext::new();
        let off = TrackedContext::new();
        on.make_current().unwrap();
        {
            let _scope = ContextScope::enter(&on, &off).unwrap();
        }
        assert_eq!(current(), Some(on.id()));
        on.release().unwrap();
    }

    #[test]
    fn failed_enter_restores_onscreen() {
        let on = TrackedContext::new();
        let off = Flaky { inner: TrackedContext::new(), fail_make_current: true };
        on.make_current().unwrap();

        assert!(ContextScope::enter(&on, &off).is_err());
        assert_eq!(current(), Some(on.id()));
        on.release().unwrap();
    }

    #[test]
    fn body_error_still_restores() {
        let on = TrackedContext::new();
        let off = TrackedContext::new();
        on.make_current().unwrap();

        let result: Result<(), ContextError> = with_offscreen(&on, &off, || {
            Err(ContextError::Unavailable("body failed".into()))
        });

        assert!(matches!(result, Err(ContextError::Unavailable(_))));
        assert_eq!(current(), Some(on.id()));
        on.release().unwrap();
    }

    #[test]
    fn restore_failure_is_propagated() {
        let on = Flaky { inner: TrackedContext::new(), fail_make_current: false };
        let off = TrackedContext::new();
        on.make_current().unwrap();

        // The body steals the offscreen context, so releasing it on exit fails.
        let result: Result<(), ContextError> = with_offscreen(&on, &off, || {
            off.release()?;
            Ok(())
        });

        assert!(matches!(result, Err(ContextError::NotCurrent(_))));
        assert_eq!(current(), Some(on.id()));
        on.release().unwrap();
    }

    #[test]
    fn with_current_releases_after_body() {
        let ctx = TrackedContext::new();
        let value: Result<u32, ContextError> = with_current(&ctx, || Ok(7));
        assert_eq!(value.unwrap(), 7);
        assert_eq!(current(), None);
    }
}
