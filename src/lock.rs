//! Per-screen lock acquisition and release.

use anyhow::Result;

use crate::backend::{Backend, SurfaceId};

/// Upper bound on attempts for each input grab.
///
/// Grab requests can transiently fail while another client briefly holds
/// ownership; spinning a bounded number of times rides out the contention
/// without either hanging forever or giving up on the first refusal.
pub const GRAB_ATTEMPTS: u32 = 10_000;

/// An armed per-screen lock: blank overlay on top, pointer and keyboard
/// owned exclusively, root watched for structure changes.
///
/// Acquisition either fully succeeds or fully unwinds; there is no
/// partially-armed lock. Release consumes the lock, so it can only happen
/// once.
pub struct ScreenLock {
    screen: usize,
    root: SurfaceId,
    overlay: SurfaceId,
}

impl ScreenLock {
    /// Tries to arm a lock on `screen`.
    ///
    /// Ok(None) means the screen stays unprotected: a competing grab never
    /// let go within the attempt bound. Errors are reserved for connection
    /// failures.
    pub fn acquire(backend: &mut Backend, screen: usize) -> Result<Option<Self>> {
        if screen >= backend.screen_count() {
            return Ok(None);
        }

        let root = backend.root(screen);
        let overlay = backend.create_overlay(screen)?;
        let lock = Self {
            screen,
            root,
            overlay,
        };

        // Pointer first, keyboard only once the pointer is owned.
        if !retry_grab(|| backend.try_grab_pointer(root))? {
            lock.release(backend)?;
            return Ok(None);
        }
        if !retry_grab(|| backend.try_grab_keyboard(root))? {
            lock.release(backend)?;
            return Ok(None);
        }

        backend.watch_root(root)?;

        trace!("armed screen {screen}");
        Ok(Some(lock))
    }

    pub fn screen(&self) -> usize {
        self.screen
    }

    pub fn overlay(&self) -> SurfaceId {
        self.overlay
    }

    /// Disarms the lock. Also the unwind path for a partial acquisition:
    /// ungrabbing a pointer that is not held is harmless.
    pub fn release(self, backend: &mut Backend) -> Result<()> {
        backend.ungrab_pointer()?;
        backend.destroy_overlay(self.overlay)
    }
}

fn retry_grab(mut attempt: impl FnMut() -> Result<bool>) -> Result<bool> {
    for _ in 0..GRAB_ATTEMPTS {
        if attempt()? {
            return Ok(true);
        }
    }
    Ok(false)
}
