//! X11 backend.
//!
//! Speaks the core protocol through x11rb and translates key events with
//! xkbcommon's X11 support, using the keymap of the core keyboard device.

use anyhow::{bail, ensure, Context, Result};
use x11rb::connection::Connection as _;
use x11rb::protocol::xproto::{
    ChangeWindowAttributesAux, ConfigureWindowAux, ConnectionExt as _, CreateWindowAux, EventMask,
    GrabMode, GrabStatus, StackMode, WindowClass,
};
use x11rb::protocol::Event as X11Event;
use x11rb::xcb_ffi::XCBConnection;
use xkbcommon::xkb;

use super::{Event, SurfaceId};

/// Volume of the mismatch bell, in percent of the base volume.
const BELL_VOLUME: i8 = 100;

struct Screen {
    root: u32,
    width: u16,
    height: u16,
    black_pixel: u32,
    root_visual: u32,
    root_depth: u8,
}

pub struct X11 {
    conn: XCBConnection,
    screens: Vec<Screen>,
    xkb_state: xkb::State,
}

impl X11 {
    pub fn new() -> Result<Self> {
        let (conn, _screen) = XCBConnection::connect(None).context("cannot open display")?;

        let screens = conn
            .setup()
            .roots
            .iter()
            .map(|screen| Screen {
                root: screen.root,
                width: screen.width_in_pixels,
                height: screen.height_in_pixels,
                black_pixel: screen.black_pixel,
                root_visual: screen.root_visual,
                root_depth: screen.root_depth,
            })
            .collect();

        let xkb_state = init_xkb(&conn)?;

        Ok(Self {
            conn,
            screens,
            xkb_state,
        })
    }

    pub fn screen_count(&self) -> usize {
        self.screens.len()
    }

    pub fn root(&self, screen: usize) -> SurfaceId {
        SurfaceId(self.screens[screen].root)
    }

    pub fn create_overlay(&mut self, screen: usize) -> Result<SurfaceId> {
        let screen = &self.screens[screen];
        let win = self.conn.generate_id()?;

        // Override-redirect keeps the window manager from decorating or
        // restacking the overlay.
        let aux = CreateWindowAux::new()
            .override_redirect(1)
            .background_pixel(screen.black_pixel);
        self.conn.create_window(
            screen.root_depth,
            win,
            screen.root,
            0,
            0,
            screen.width,
            screen.height,
            0,
            WindowClass::INPUT_OUTPUT,
            screen.root_visual,
            &aux,
        )?;

        self.conn.map_window(win)?;
        self.conn
            .configure_window(win, &ConfigureWindowAux::new().stack_mode(StackMode::ABOVE))?;
        self.conn.flush()?;

        Ok(SurfaceId(win))
    }

    pub fn raise_overlay(&mut self, overlay: SurfaceId) -> Result<()> {
        self.conn.configure_window(
            overlay.0,
            &ConfigureWindowAux::new().stack_mode(StackMode::ABOVE),
        )?;
        self.conn.flush()?;
        Ok(())
    }

    pub fn destroy_overlay(&mut self, overlay: SurfaceId) -> Result<()> {
        self.conn.destroy_window(overlay.0)?;
        self.conn.flush()?;
        Ok(())
    }

    pub fn try_grab_pointer(&mut self, root: SurfaceId) -> Result<bool> {
        let reply = self
            .conn
            .grab_pointer(
                false,
                root.0,
                EventMask::BUTTON_PRESS | EventMask::BUTTON_RELEASE | EventMask::POINTER_MOTION,
                GrabMode::ASYNC,
                GrabMode::ASYNC,
                x11rb::NONE,
                x11rb::NONE,
                x11rb::CURRENT_TIME,
            )?
            .reply()?;
        Ok(reply.status == GrabStatus::SUCCESS)
    }

    pub fn try_grab_keyboard(&mut self, root: SurfaceId) -> Result<bool> {
        // Owner-events, so key state is reported even for events destined
        // for other surfaces and held keys are not lost to focus changes.
        let reply = self
            .conn
            .grab_keyboard(
                true,
                root.0,
                x11rb::CURRENT_TIME,
                GrabMode::ASYNC,
                GrabMode::ASYNC,
            )?
            .reply()?;
        Ok(reply.status == GrabStatus::SUCCESS)
    }

    pub fn ungrab_pointer(&mut self) -> Result<()> {
        self.conn.ungrab_pointer(x11rb::CURRENT_TIME)?;
        self.conn.flush()?;
        Ok(())
    }

    pub fn watch_root(&mut self, root: SurfaceId) -> Result<()> {
        let aux = ChangeWindowAttributesAux::new().event_mask(EventMask::SUBSTRUCTURE_NOTIFY);
        self.conn.change_window_attributes(root.0, &aux)?;
        self.conn.flush()?;
        Ok(())
    }

    pub fn next_event(&mut self) -> Result<Event> {
        let event = self.conn.wait_for_event()?;

        Ok(match event {
            X11Event::KeyPress(press) => {
                let keycode: xkb::Keycode = u32::from(press.detail).into();
                // Look up before feeding the press into the state, so the
                // modifiers in effect are the ones held when the key went
                // down.
                let keysym = self.xkb_state.key_get_one_sym(keycode);
                let text = self.xkb_state.key_get_utf8(keycode);
                self.xkb_state.update_key(keycode, xkb::KeyDirection::Down);
                Event::KeyPress { keysym, text }
            }
            X11Event::KeyRelease(release) => {
                let keycode: xkb::Keycode = u32::from(release.detail).into();
                self.xkb_state.update_key(keycode, xkb::KeyDirection::Up);
                Event::Other
            }
            _ => Event::Other,
        })
    }

    pub fn bell(&mut self) -> Result<()> {
        self.conn.bell(BELL_VOLUME)?;
        self.conn.flush()?;
        Ok(())
    }
}

fn init_xkb(conn: &XCBConnection) -> Result<xkb::State> {
    let mut major = 0;
    let mut minor = 0;
    let mut base_event = 0;
    let mut base_error = 0;
    let ok = xkb::x11::setup_xkb_extension(
        conn,
        xkb::x11::MIN_MAJOR_XKB_VERSION,
        xkb::x11::MIN_MINOR_XKB_VERSION,
        xkb::x11::SetupXkbExtensionFlags::NoFlags,
        &mut major,
        &mut minor,
        &mut base_event,
        &mut base_error,
    );
    ensure!(ok, "cannot initialize the XKB extension");

    let context = xkb::Context::new(xkb::CONTEXT_NO_FLAGS);
    let device_id = xkb::x11::get_core_keyboard_device_id(conn);
    if device_id < 0 {
        bail!("cannot find the core keyboard device");
    }

    let keymap = xkb::x11::keymap_new_from_device(
        &context,
        conn,
        device_id,
        xkb::KEYMAP_COMPILE_NO_FLAGS,
    );
    Ok(xkb::x11::state_new_from_device(&keymap, conn, device_id))
}
