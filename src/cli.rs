use clap::Parser;

use crate::utils::version;

/// Lock every screen of the X display and wait for the user's password.
///
/// The display stays locked until the password matching the invoking user's
/// entry in the system password database is typed, followed by Enter.
#[derive(Parser)]
#[command(version = &*version().leak(), about, long_about = None)]
pub struct Cli {}
