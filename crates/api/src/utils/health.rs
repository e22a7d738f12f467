//! Health report for the application context

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Overall health of the application
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthStatus {
    pub is_healthy: bool,

    /// Fraction of healthy components, 0.0 to 1.0
    pub score: f64,

    pub message: Option<String>,
    pub components: Vec<ComponentHealth>,
    pub checked_at: DateTime<Utc>,
}

impl HealthStatus {
    pub fn new(checked_at: DateTime<Utc>) -> Self {
        Self { is_healthy: true, score: 1.0, message: None, components: Vec::new(), checked_at }
    }

    pub fn add_component(mut self, component: ComponentHealth) -> Self {
        self.components.push(component);
        self
    }

    /// Recompute `score`. Healthy only when every component is.
    pub fn calculate_score(&mut self) {
        if self.components.is_empty() {
            return;
        }

        let healthy = self.components.iter().filter(|c| c.is_healthy).count();
        self.score = healthy as f64 / self.components.len() as f64;
        self.is_healthy = healthy == self.components.len();
        if !self.is_healthy {
            let failing: Vec<&str> =
                self.components.iter().filter(|c| !c.is_healthy).map(|c| c.name.as_str()).collect();
            self.message = Some(format!("unhealthy: {}", failing.join(", ")));
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentHealth {
    /// Component identifier (e.g. "database", "system_key")
    pub name: String,
    pub is_healthy: bool,
    pub message: Option<String>,
}

impl ComponentHealth {
    pub fn healthy(name: impl Into<String>) -> Self {
        Self { name: name.into(), is_healthy: true, message: None }
    }

    pub fn unhealthy(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self { name: name.into(), is_healthy: false, message: Some(message.into()) }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}
