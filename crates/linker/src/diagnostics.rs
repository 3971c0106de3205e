//! Diagnostic output.
//!
//! The linker only emits `tracing` events; installing a subscriber is up to
//! the host. Hosts without one can route diagnostics to stderr here.

use tracing::Level;

/// Installs a global fmt subscriber writing to stderr.
///
/// `verbose` lowers the level to `DEBUG` so resolution and generation traces
/// show up. Returns false if a global subscriber was already installed.
pub fn install_stderr_subscriber(verbose: bool) -> bool {
	let level = if verbose { Level::DEBUG } else { Level::WARN };
	tracing_subscriber::fmt()
		.with_writer(std::io::stderr)
		.with_max_level(level)
		.with_target(true)
		.try_init()
		.is_ok()
}
