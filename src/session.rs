//! Lock session: multi-screen acquisition and the password-entry loop.

use anyhow::{ensure, Result};
use xkbcommon::xkb::Keysym;

use crate::auth;
use crate::backend::{Backend, Event};
use crate::entry::EntryBuffer;
use crate::keys;
use crate::lock::ScreenLock;

pub struct Session {
    backend: Backend,
    // Indexed by screen; a screen that could not be locked is None.
    locks: Vec<Option<ScreenLock>>,
    hash: String,
    entry: EntryBuffer,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session").finish_non_exhaustive()
    }
}

impl Session {
    /// Locks every screen it can. Screens under persistent grab contention
    /// are left unprotected with a warning; locking nothing at all is an
    /// error, since running unlocked would only pretend to protect the
    /// display.
    pub fn lock(mut backend: Backend, hash: String) -> Result<Self> {
        let nscreens = backend.screen_count();
        let mut locks = Vec::with_capacity(nscreens);
        let mut armed = 0;

        for screen in 0..nscreens {
            match ScreenLock::acquire(&mut backend, screen)? {
                Some(lock) => {
                    armed += 1;
                    locks.push(Some(lock));
                }
                None => {
                    warn!("screen {screen} is left unprotected: could not grab input");
                    locks.push(None);
                }
            }
        }

        ensure!(armed > 0, "cannot lock any screen");
        info!("locked {armed} of {nscreens} screen(s)");

        Ok(Self {
            backend,
            locks,
            hash,
            entry: EntryBuffer::new(),
        })
    }

    /// Runs the password-entry loop until the correct password is entered,
    /// then releases every armed lock.
    pub fn run(mut self) -> Result<()> {
        loop {
            match self.backend.next_event()? {
                Event::KeyPress { keysym, text } => {
                    if self.handle_key(keysym, &text)? {
                        break;
                    }
                }
                // Something else happened, possibly a new window trying to
                // cover the overlays. Put them back on top.
                Event::Other => self.raise_all()?,
            }
        }

        info!("password accepted, unlocking");
        self.release_all()
    }

    /// Feeds one key press through the entry state machine. Returns true
    /// when the password matched.
    fn handle_key(&mut self, keysym: Keysym, text: &str) -> Result<bool> {
        let sym = keys::normalize(keysym);
        if keys::is_ignored(sym) {
            return Ok(false);
        }

        match sym {
            Keysym::Return => {
                if auth::verify(self.entry.as_str(), &self.hash) {
                    return Ok(true);
                }

                debug!("password mismatch");
                self.backend.bell()?;
                self.entry.clear();
            }
            Keysym::Escape => self.entry.clear(),
            Keysym::BackSpace => {
                self.entry.backspace();
            }
            _ => {
                // Whole input or nothing; anything carrying control bytes
                // or overflowing the buffer is dropped silently.
                if !text.is_empty() && !text.bytes().any(|b| b.is_ascii_control()) {
                    self.entry.append(text);
                }
            }
        }

        Ok(false)
    }

    fn raise_all(&mut self) -> Result<()> {
        for lock in self.locks.iter().flatten() {
            self.backend.raise_overlay(lock.overlay())?;
        }
        Ok(())
    }

    fn release_all(mut self) -> Result<()> {
        for lock in self.locks.drain(..).flatten() {
            lock.release(&mut self.backend)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use pwhash::sha512_crypt;

    use super::*;
    use crate::backend::Headless;
    use crate::entry::CAPACITY;

    fn hash_for(password: &str) -> String {
        sha512_crypt::hash(password).unwrap()
    }

    // Latin-1 characters map to the keysym of the same value.
    fn key_for_char(c: char) -> Keysym {
        Keysym::new(c as u32)
    }

    fn type_str(headless: &mut Headless, s: &str) {
        for c in s.chars() {
            headless.push_key(key_for_char(c), &c.to_string());
        }
    }

    fn press_enter(headless: &mut Headless) {
        headless.push_key(Keysym::Return, "\r");
    }

    fn press_escape(headless: &mut Headless) {
        headless.push_key(Keysym::Escape, "\x1b");
    }

    fn press_backspace(headless: &mut Headless) {
        headless.push_key(Keysym::BackSpace, "\x08");
    }

    #[test]
    fn correct_password_unlocks_and_releases() {
        let mut headless = Headless::new(2);
        type_str(&mut headless, "secret");
        press_enter(&mut headless);
        let recorder = headless.recorder();

        let session = Session::lock(Backend::Headless(headless), hash_for("secret")).unwrap();
        session.run().unwrap();

        let rec = recorder.lock().unwrap();
        assert_eq!(rec.destroyed.len(), 2);
        assert_eq!(rec.pointer_ungrabs, 2);
        assert_eq!(rec.bells, 0);
    }

    #[test]
    fn wrong_password_rings_the_bell_and_keeps_running() {
        let mut headless = Headless::new(1);
        type_str(&mut headless, "abc");
        press_enter(&mut headless);
        // The loop keeps going after the mismatch; the buffer was reset, so
        // the correct password entered afterwards matches in full.
        type_str(&mut headless, "secret");
        press_enter(&mut headless);
        let recorder = headless.recorder();

        let session = Session::lock(Backend::Headless(headless), hash_for("secret")).unwrap();
        session.run().unwrap();

        let rec = recorder.lock().unwrap();
        assert_eq!(rec.bells, 1);
        assert_eq!(rec.destroyed.len(), 1);
    }

    #[test]
    fn overflow_keeps_exactly_the_first_capacity_bytes() {
        let password = "a".repeat(CAPACITY);

        let mut headless = Headless::new(1);
        // Ten keystrokes past capacity; they must all be dropped, leaving
        // the buffer holding exactly the password.
        type_str(&mut headless, &"a".repeat(CAPACITY + 10));
        press_enter(&mut headless);
        let recorder = headless.recorder();

        let session = Session::lock(Backend::Headless(headless), hash_for(&password)).unwrap();
        session.run().unwrap();

        assert_eq!(recorder.lock().unwrap().bells, 0);
    }

    #[test]
    fn contended_screen_is_skipped_and_the_rest_are_released() {
        let mut headless = Headless::new(3);
        headless.refuse_pointer_grabs(1, u32::MAX);
        type_str(&mut headless, "secret");
        press_enter(&mut headless);
        let recorder = headless.recorder();

        let session = Session::lock(Backend::Headless(headless), hash_for("secret")).unwrap();
        // Screen 1 failed acquisition and unwound its own overlay.
        let destroyed_during_lock = recorder.lock().unwrap().destroyed.len();
        assert_eq!(destroyed_during_lock, 1);

        session.run().unwrap();

        let rec = recorder.lock().unwrap();
        assert_eq!(rec.destroyed.len() - destroyed_during_lock, 2);
    }

    #[test]
    fn escape_clears_the_entry_without_feedback() {
        let mut headless = Headless::new(1);
        type_str(&mut headless, "garbage");
        press_escape(&mut headless);
        type_str(&mut headless, "secret");
        press_enter(&mut headless);
        let recorder = headless.recorder();

        let session = Session::lock(Backend::Headless(headless), hash_for("secret")).unwrap();
        session.run().unwrap();

        assert_eq!(recorder.lock().unwrap().bells, 0);
    }

    #[test]
    fn backspace_edits_the_entry() {
        let mut headless = Headless::new(1);
        type_str(&mut headless, "secrett");
        press_backspace(&mut headless);
        press_enter(&mut headless);
        let recorder = headless.recorder();

        let session = Session::lock(Backend::Headless(headless), hash_for("secret")).unwrap();
        session.run().unwrap();

        assert_eq!(recorder.lock().unwrap().bells, 0);
    }

    #[test]
    fn keypad_entry_matches_main_keyboard_entry() {
        let mut headless = Headless::new(1);
        headless.push_key(Keysym::KP_4, "4");
        headless.push_key(Keysym::KP_2, "2");
        headless.push_key(Keysym::KP_Enter, "\r");
        let recorder = headless.recorder();

        let session = Session::lock(Backend::Headless(headless), hash_for("42")).unwrap();
        session.run().unwrap();

        assert_eq!(recorder.lock().unwrap().bells, 0);
    }

    #[test]
    fn special_keys_and_control_bytes_contribute_nothing() {
        let mut headless = Headless::new(1);
        headless.push_key(Keysym::F1, "");
        // Keypad operators carry text but stay filtered.
        headless.push_key(Keysym::KP_Add, "+");
        type_str(&mut headless, "se");
        // A control sequence such as Ctrl+C must be dropped whole.
        headless.push_key(Keysym::c, "\x03");
        type_str(&mut headless, "cret");
        press_enter(&mut headless);
        let recorder = headless.recorder();

        let session = Session::lock(Backend::Headless(headless), hash_for("secret")).unwrap();
        session.run().unwrap();

        assert_eq!(recorder.lock().unwrap().bells, 0);
    }

    #[test]
    fn other_events_re_raise_every_armed_overlay() {
        let mut headless = Headless::new(2);
        headless.push_other();
        type_str(&mut headless, "secret");
        press_enter(&mut headless);
        let recorder = headless.recorder();

        let session = Session::lock(Backend::Headless(headless), hash_for("secret")).unwrap();
        session.run().unwrap();

        assert_eq!(recorder.lock().unwrap().raised.len(), 2);
    }

    #[test]
    fn locking_nothing_is_an_error() {
        let mut headless = Headless::new(2);
        headless.refuse_pointer_grabs(0, u32::MAX);
        headless.refuse_keyboard_grabs(1, u32::MAX);
        let recorder = headless.recorder();

        let err = Session::lock(Backend::Headless(headless), hash_for("secret")).unwrap_err();
        assert!(err.to_string().contains("cannot lock any screen"));

        // Both screens unwound; nothing remains armed.
        let rec = recorder.lock().unwrap();
        assert_eq!(rec.destroyed.len(), 2);
        assert_eq!(rec.pointer_ungrabs, 2);
    }
}
