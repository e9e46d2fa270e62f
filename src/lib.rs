#[macro_use]
extern crate tracing;

pub mod auth;
pub mod backend;
pub mod cli;
pub mod entry;
pub mod keys;
pub mod lock;
pub mod session;
pub mod utils;
