use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use kameo::actor::ActorRef;
use kameo::error::Infallible;
use kameo::message::{Context, Message};
use kameo::Actor;
use serde::Serialize;

use crate::actors::core::{component, ComponentHealth, HealthStatus};
use crate::db::OrderRepository;

// ============================================================================
// Health Monitor Actor - Monitors system health
// ============================================================================
//
// Responsibilities:
// - Track health status of storage, message bus, warm-up and ingestion
// - Probe storage periodically
// - Gate readiness on completion of the cache warm-up
//
// ============================================================================

const STORAGE_PROBE_INTERVAL: Duration = Duration::from_secs(10);

// ============================================================================
// Messages
// ============================================================================

#[derive(Debug)]
pub struct UpdateHealth {
    pub component: String,
    pub status: HealthStatus,
    pub details: Option<String>,
}

impl UpdateHealth {
    pub fn new(component: &str, status: HealthStatus) -> Self {
        Self {
            component: component.to_string(),
            status,
            details: None,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }
}

/// Sent once the cache warm-up has finished, successfully or not.
#[derive(Debug)]
pub struct MarkReady;

#[derive(Debug)]
pub struct GetSystemHealth;

#[derive(Debug, Clone, Serialize, kameo::Reply)]
pub struct SystemHealth {
    pub overall_status: HealthStatus,
    pub ready: bool,
    pub components: HashMap<String, ComponentHealth>,
    pub check_time: chrono::DateTime<Utc>,
}

impl SystemHealth {
    /// Serve traffic only after warm-up and while nothing is unhealthy.
    pub fn is_serving(&self) -> bool {
        self.ready && !self.overall_status.is_unhealthy()
    }
}

// ============================================================================
// Health Monitor Actor
// ============================================================================

pub struct HealthMonitorActor {
    components: HashMap<String, ComponentHealth>,
    ready: bool,
    repository: Option<Arc<dyn OrderRepository>>,
}

impl HealthMonitorActor {
    pub fn new(repository: Arc<dyn OrderRepository>) -> Self {
        Self {
            components: HashMap::new(),
            ready: false,
            repository: Some(repository),
        }
    }

    /// A monitor that only records what it is told.
    pub fn without_probes() -> Self {
        Self {
            components: HashMap::new(),
            ready: false,
            repository: None,
        }
    }

    fn compute_overall_status(&self) -> HealthStatus {
        let mut has_degraded = false;
        let mut unhealthy_components = Vec::new();

        for (name, health) in &self.components {
            match &health.status {
                HealthStatus::Unhealthy(msg) => {
                    unhealthy_components.push(format!("{}: {}", name, msg));
                }
                HealthStatus::Degraded(_) => {
                    has_degraded = true;
                }
                HealthStatus::Healthy => {}
            }
        }

        if !unhealthy_components.is_empty() {
            unhealthy_components.sort();
            HealthStatus::Unhealthy(unhealthy_components.join(", "))
        } else if has_degraded {
            HealthStatus::Degraded("Some components degraded".to_string())
        } else {
            HealthStatus::Healthy
        }
    }
}

impl Actor for HealthMonitorActor {
    type Args = Self;
    type Error = Infallible;

    async fn on_start(state: Self::Args, actor_ref: ActorRef<Self>) -> Result<Self, Self::Error> {
        tracing::info!("HealthMonitorActor started");

        if let Some(repository) = state.repository.clone() {
            // Weak, so the probe never keeps the monitor alive on its own.
            let monitor = actor_ref.downgrade();
            tokio::spawn(async move {
                let mut interval = tokio::time::interval(STORAGE_PROBE_INTERVAL);
                loop {
                    interval.tick().await;

                    let status = match repository.ping().await {
                        Ok(()) => HealthStatus::Healthy,
                        Err(e) => HealthStatus::Unhealthy(e.to_string()),
                    };

                    let Some(actor_ref) = monitor.upgrade() else {
                        break;
                    };
                    if actor_ref.tell(UpdateHealth::new(component::STORAGE, status)).await.is_err() {
                        break;
                    }
                }
                tracing::debug!("Storage probe stopped");
            });
        }

        Ok(state)
    }
}

// ============================================================================
// Message Handlers
// ============================================================================

impl Message<UpdateHealth> for HealthMonitorActor {
    type Reply = ();

    async fn handle(&mut self, msg: UpdateHealth, _ctx: &mut Context<Self, Self::Reply>) -> Self::Reply {
        tracing::debug!(
            component = %msg.component,
            status = ?msg.status,
            "Updated component health"
        );

        let health = ComponentHealth::new(msg.component.clone(), msg.status).with_details(msg.details);
        self.components.insert(msg.component, health);
    }
}

impl Message<MarkReady> for HealthMonitorActor {
    type Reply = ();

    async fn handle(&mut self, _msg: MarkReady, _ctx: &mut Context<Self, Self::Reply>) -> Self::Reply {
        tracing::info!("Service marked ready");
        self.ready = true;
    }
}

impl Message<GetSystemHealth> for HealthMonitorActor {
    type Reply = SystemHealth;

    async fn handle(&mut self, _msg: GetSystemHealth, _ctx: &mut Context<Self, Self::Reply>) -> Self::Reply {
        SystemHealth {
            overall_status: self.compute_overall_status(),
            ready: self.ready,
            components: self.components.clone(),
            check_time: Utc::now(),
        }
    }
}
