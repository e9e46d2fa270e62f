//! Windowing-system backends.
//!
//! The session logic only sees this interface: screens with root surfaces,
//! overlays that can be created, raised and destroyed, grab attempts, and a
//! blocking stream of events. The X11 backend talks to a real display; the
//! headless backend is an in-memory stand-in for tests.

use anyhow::Result;
use xkbcommon::xkb::Keysym;

pub mod headless;
pub use headless::Headless;

pub mod x11;
pub use x11::X11;

/// Opaque id of a windowing-system surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SurfaceId(pub(crate) u32);

/// One wakeup of the session loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// A key press, translated to a keysym plus the text it produced.
    KeyPress { keysym: Keysym, text: String },
    /// Anything else: key releases, structure changes on a watched root,
    /// pointer events. The session reacts to all of these the same way.
    Other,
}

pub enum Backend {
    X11(X11),
    Headless(Headless),
}

impl Backend {
    pub fn screen_count(&self) -> usize {
        match self {
            Backend::X11(x11) => x11.screen_count(),
            Backend::Headless(headless) => headless.screen_count(),
        }
    }

    /// Root surface of a screen. The screen index must be in range.
    pub fn root(&self, screen: usize) -> SurfaceId {
        match self {
            Backend::X11(x11) => x11.root(screen),
            Backend::Headless(headless) => headless.root(screen),
        }
    }

    /// Creates a blank full-screen overlay, mapped and raised.
    pub fn create_overlay(&mut self, screen: usize) -> Result<SurfaceId> {
        match self {
            Backend::X11(x11) => x11.create_overlay(screen),
            Backend::Headless(headless) => headless.create_overlay(screen),
        }
    }

    pub fn raise_overlay(&mut self, overlay: SurfaceId) -> Result<()> {
        match self {
            Backend::X11(x11) => x11.raise_overlay(overlay),
            Backend::Headless(headless) => headless.raise_overlay(overlay),
        }
    }

    pub fn destroy_overlay(&mut self, overlay: SurfaceId) -> Result<()> {
        match self {
            Backend::X11(x11) => x11.destroy_overlay(overlay),
            Backend::Headless(headless) => headless.destroy_overlay(overlay),
        }
    }

    /// One attempt at exclusive pointer ownership on `root`; Ok(false)
    /// means another client currently holds it.
    pub fn try_grab_pointer(&mut self, root: SurfaceId) -> Result<bool> {
        match self {
            Backend::X11(x11) => x11.try_grab_pointer(root),
            Backend::Headless(headless) => headless.try_grab_pointer(root),
        }
    }

    /// One attempt at exclusive keyboard ownership on `root`.
    pub fn try_grab_keyboard(&mut self, root: SurfaceId) -> Result<bool> {
        match self {
            Backend::X11(x11) => x11.try_grab_keyboard(root),
            Backend::Headless(headless) => headless.try_grab_keyboard(root),
        }
    }

    /// Releases pointer ownership. Harmless when nothing is held.
    pub fn ungrab_pointer(&mut self) -> Result<()> {
        match self {
            Backend::X11(x11) => x11.ungrab_pointer(),
            Backend::Headless(headless) => headless.ungrab_pointer(),
        }
    }

    /// Subscribes to structure changes below `root`, so that windows
    /// appearing over the overlay can be detected.
    pub fn watch_root(&mut self, root: SurfaceId) -> Result<()> {
        match self {
            Backend::X11(x11) => x11.watch_root(root),
            Backend::Headless(headless) => headless.watch_root(root),
        }
    }

    /// Blocks until the next event. The only suspension point in the
    /// program.
    pub fn next_event(&mut self) -> Result<Event> {
        match self {
            Backend::X11(x11) => x11.next_event(),
            Backend::Headless(headless) => headless.next_event(),
        }
    }

    pub fn bell(&mut self) -> Result<()> {
        match self {
            Backend::X11(x11) => x11.bell(),
            Backend::Headless(headless) => headless.bell(),
        }
    }
}
