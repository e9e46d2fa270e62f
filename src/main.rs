use std::env;

use clap::Parser;
use shroud::auth;
use shroud::backend::{Backend, X11};
use shroud::cli::Cli;
use shroud::session::Session;
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    let directives = env::var("RUST_LOG").unwrap_or_else(|_| "shroud=debug,info".to_owned());
    let env_filter = EnvFilter::builder().parse_lossy(directives);
    tracing_subscriber::fmt()
        .compact()
        .with_env_filter(env_filter)
        .init();

    let _cli = Cli::parse();

    // Resolve the credential before touching the display; without it there
    // is nothing to lock for.
    let hash = auth::password_hash()?;

    let backend = Backend::X11(X11::new()?);
    let session = Session::lock(backend, hash)?;
    session.run()
}
