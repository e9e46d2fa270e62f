//! Headless backend for tests.
//!
//! Simulates a display with a configurable number of screens, per-screen
//! grab contention, and a scripted event queue. Every call the session
//! makes is recorded, so tests can assert on raises, destroys, ungrabs and
//! bells after the session is gone.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use anyhow::{bail, Result};
use xkbcommon::xkb::Keysym;

use super::{Event, SurfaceId};

/// Calls made against the backend, for tests to assert on.
#[derive(Debug, Default)]
pub struct Recorder {
    pub raised: Vec<SurfaceId>,
    pub destroyed: Vec<SurfaceId>,
    pub watched_roots: Vec<SurfaceId>,
    pub pointer_ungrabs: usize,
    pub bells: usize,
}

struct Screen {
    root: SurfaceId,
    // Remaining grab attempts to refuse, simulating a competing client
    // that holds ownership for a while.
    refuse_pointer: u32,
    refuse_keyboard: u32,
}

pub struct Headless {
    screens: Vec<Screen>,
    script: VecDeque<Event>,
    next_surface: u32,
    recorder: Arc<Mutex<Recorder>>,
}

impl Headless {
    pub fn new(screens: usize) -> Self {
        let screens = (0..screens)
            .map(|i| Screen {
                root: SurfaceId(0x8000_0000 + i as u32),
                refuse_pointer: 0,
                refuse_keyboard: 0,
            })
            .collect();

        Self {
            screens,
            script: VecDeque::new(),
            next_surface: 1,
            recorder: Arc::default(),
        }
    }

    pub fn recorder(&self) -> Arc<Mutex<Recorder>> {
        self.recorder.clone()
    }

    /// Makes the first `attempts` pointer grab attempts on `screen` fail.
    pub fn refuse_pointer_grabs(&mut self, screen: usize, attempts: u32) {
        self.screens[screen].refuse_pointer = attempts;
    }

    /// Makes the first `attempts` keyboard grab attempts on `screen` fail.
    pub fn refuse_keyboard_grabs(&mut self, screen: usize, attempts: u32) {
        self.screens[screen].refuse_keyboard = attempts;
    }

    /// Scripts a key press for the session loop to consume.
    pub fn push_key(&mut self, keysym: Keysym, text: &str) {
        self.script.push_back(Event::KeyPress {
            keysym,
            text: text.to_owned(),
        });
    }

    /// Scripts a non-key event.
    pub fn push_other(&mut self) {
        self.script.push_back(Event::Other);
    }

    pub fn screen_count(&self) -> usize {
        self.screens.len()
    }

    pub fn root(&self, screen: usize) -> SurfaceId {
        self.screens[screen].root
    }

    pub fn create_overlay(&mut self, _screen: usize) -> Result<SurfaceId> {
        let id = SurfaceId(self.next_surface);
        self.next_surface += 1;
        Ok(id)
    }

    pub fn raise_overlay(&mut self, overlay: SurfaceId) -> Result<()> {
        self.recorder.lock().unwrap().raised.push(overlay);
        Ok(())
    }

    pub fn destroy_overlay(&mut self, overlay: SurfaceId) -> Result<()> {
        self.recorder.lock().unwrap().destroyed.push(overlay);
        Ok(())
    }

    pub fn try_grab_pointer(&mut self, root: SurfaceId) -> Result<bool> {
        let screen = self.screen_by_root(root)?;
        if screen.refuse_pointer > 0 {
            screen.refuse_pointer -= 1;
            return Ok(false);
        }
        Ok(true)
    }

    pub fn try_grab_keyboard(&mut self, root: SurfaceId) -> Result<bool> {
        let screen = self.screen_by_root(root)?;
        if screen.refuse_keyboard > 0 {
            screen.refuse_keyboard -= 1;
            return Ok(false);
        }
        Ok(true)
    }

    pub fn ungrab_pointer(&mut self) -> Result<()> {
        self.recorder.lock().unwrap().pointer_ungrabs += 1;
        Ok(())
    }

    pub fn watch_root(&mut self, root: SurfaceId) -> Result<()> {
        self.recorder.lock().unwrap().watched_roots.push(root);
        Ok(())
    }

    pub fn next_event(&mut self) -> Result<Event> {
        match self.script.pop_front() {
            Some(event) => Ok(event),
            // A session that outruns its script is a broken test; fail
            // loudly instead of blocking forever.
            None => bail!("headless event script exhausted"),
        }
    }

    pub fn bell(&mut self) -> Result<()> {
        self.recorder.lock().unwrap().bells += 1;
        Ok(())
    }

    fn screen_by_root(&mut self, root: SurfaceId) -> Result<&mut Screen> {
        match self.screens.iter_mut().find(|screen| screen.root == root) {
            Some(screen) => Ok(screen),
            None => bail!("no screen with root {root:?}"),
        }
    }
}
