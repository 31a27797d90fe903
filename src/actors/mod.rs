// ============================================================================
// Actors Module
// ============================================================================
//
// - core/           - health types shared by reporters and the monitor
// - infrastructure/ - the health monitor actor
//
// Ingestion and lookups are plain tasks/services, not actors.
//
// ============================================================================

mod core;
mod infrastructure;

pub use self::core::{component, ComponentHealth, HealthStatus};
pub use infrastructure::{
    GetSystemHealth, HealthMonitorActor, MarkReady, SystemHealth, UpdateHealth,
};
