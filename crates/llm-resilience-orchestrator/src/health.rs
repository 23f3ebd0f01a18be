//! `health_check` (§4.6): a tiny parallel probe per registered model,
//! with errors categorized without leaking provider-specific detail.

use crate::orchestrator::LlmOrchestrator;
use futures::future::join_all;
use llm_resilience_core::{ErrorKind, PhysicalModel};
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    Healthy,
    Unhealthy { category: ErrorKind },
}

impl LlmOrchestrator {
    /// Probes every registered physical model in parallel with a short,
    /// bounded timeout (§4.6: "≤5s"). A model whose probe exceeds the
    /// timeout is reported `Unhealthy { category: Timeout }`, never left
    /// pending.
    pub async fn health_check(&self) -> HashMap<PhysicalModel, HealthStatus> {
        let timeout = self.config().probe_timeout;
        let targets: Vec<(PhysicalModel, _)> = self
            .providers
            .iter()
            .map(|entry| (entry.key().clone(), std::sync::Arc::clone(entry.value())))
            .collect();

        let probes = targets.into_iter().map(|(physical, client)| async move {
            let outcome = match tokio::time::timeout(timeout, client.probe()).await {
                Ok(Ok(())) => HealthStatus::Healthy,
                Ok(Err(e)) => HealthStatus::Unhealthy { category: e.kind },
                Err(_) => HealthStatus::Unhealthy { category: ErrorKind::Timeout },
            };
            (physical, outcome)
        });

        join_all(probes).await.into_iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{orchestrator_with_clients, DelayedClient, FailingClient};
    use llm_resilience_core::LogicalModel;
    use std::sync::Arc;

    #[tokio::test]
    async fn health_check_reports_healthy_and_unhealthy_separately() {
        let orch = orchestrator_with_clients(vec![(
            LogicalModel::new("ok"),
            PhysicalModel::new("ok"),
            DelayedClient::immediate("pong"),
        )]);
        orch.register_model(
            LogicalModel::new("broken"),
            PhysicalModel::new("broken"),
            llm_resilience_core::Provider::new("broken"),
            1,
            Arc::new(FailingClient),
        );

        let statuses = orch.health_check().await;
        assert_eq!(statuses.get(&PhysicalModel::new("ok")), Some(&HealthStatus::Healthy));
        assert!(matches!(
            statuses.get(&PhysicalModel::new("broken")),
            Some(HealthStatus::Unhealthy { .. })
        ));
    }
}
