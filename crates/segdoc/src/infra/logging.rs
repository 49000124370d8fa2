//! Tracing subscriber setup for the binary.

use tracing::Level;

/// Install the global fmt subscriber writing to stderr.
///
/// Library operations only emit events; they behave the same when no subscriber
/// is installed.
pub fn init(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let _ = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
