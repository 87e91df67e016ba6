use crate::core::AppState;
use tracing::{info, warn};

/// Logs the active profile and probes the database once.
///
/// The service stays up when the database is unreachable; handlers that need
/// it will report `Database error occurred` until it comes back.
pub async fn initialize_on_startup(state: &AppState) {
    let profile = &state.profile;
    info!(
        environment = %profile.environment,
        debug = profile.debug,
        database_uri = %profile.redacted_database_uri(),
        "configuration loaded"
    );

    match state.db.health().await {
        Ok(ok) => info!(db_health = ok, "startup"),
        Err(e) => warn!(error = %e, "database not reachable at startup"),
    }
}
