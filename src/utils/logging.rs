// ============================================================================
// Logging setup
// ============================================================================

use tracing::Level;

/// Install a `fmt` subscriber writing at `level` and above.
///
/// Returns `false` when a global subscriber is already installed, so it is
/// safe to call from tests and binaries alike.
pub fn init_logging(level: Level) -> bool {
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .try_init()
        .is_ok()
}
