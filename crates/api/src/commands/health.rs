//! Health check command

use pocket_domain::Result as DomainResult;
use pocket_infra::SCHEMA_VERSION;

use crate::context::AppContext;
use crate::utils::command_helpers::execute_command;
use crate::utils::health::{ComponentHealth, HealthStatus};

/// Database, pool, schema and system key health.
///
/// Component failures are reported in the status rather than as an error.
pub async fn get_app_health(ctx: &AppContext) -> DomainResult<HealthStatus> {
    execute_command("health::get_app_health", async {
        let database = match ctx.db.health_check() {
            Ok(()) => ComponentHealth::healthy("database"),
            Err(err) => ComponentHealth::unhealthy("database", err.to_string()),
        };

        let pool_status = ctx.db.pool_health();
        let pool = if pool_status.healthy {
            ComponentHealth::healthy("connection_pool").with_message(format!(
                "{} active, {} idle of {}",
                pool_status.active_connections,
                pool_status.idle_connections,
                pool_status.max_connections
            ))
        } else {
            ComponentHealth::unhealthy(
                "connection_pool",
                pool_status.message.unwrap_or_else(|| "pool unavailable".into()),
            )
        };

        let schema = match ctx.db.schema_version() {
            Ok(version) if version == SCHEMA_VERSION => ComponentHealth::healthy("schema"),
            Ok(version) => ComponentHealth::unhealthy(
                "schema",
                format!("expected version {SCHEMA_VERSION}, found {version}"),
            ),
            Err(err) => ComponentHealth::unhealthy("schema", err.to_string()),
        };

        let system_key = match ctx.rotator.current_state().await {
            Ok(state) => ComponentHealth::healthy("system_key").with_message(state.status.to_string()),
            Err(err) => ComponentHealth::unhealthy("system_key", err.to_string()),
        };

        let mut status = HealthStatus::new(ctx.clock.now())
            .add_component(database)
            .add_component(pool)
            .add_component(schema)
            .add_component(system_key);
        status.calculate_score();
        Ok(status)
    })
    .await
}
