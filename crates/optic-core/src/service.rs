//! Request orchestration.
//!
//! Ties the pieces together for one request: normalized text goes into a
//! fresh workspace, the planner runs against it, and the workspace is torn
//! down before the outcome is handed back.

use std::path::PathBuf;

use tracing::warn;

use crate::planner::{InvocationOutcome, PlannerConfig, PlannerInvoker};
use crate::source::PlanRequest;
use crate::workspace::WorkspaceManager;

/// Everything a [`PlanService`] needs, passed in explicitly.
#[derive(Debug, Clone, Default)]
pub struct ServiceConfig {
    pub planner: PlannerConfig,
    /// Parent directory for per-request workspaces; OS temp dir when `None`.
    pub workspace_root: Option<PathBuf>,
}

/// Stateless per-request pipeline. Cheap to clone and share across tasks.
#[derive(Debug, Clone)]
pub struct PlanService {
    invoker: PlannerInvoker,
    workspaces: WorkspaceManager,
}

impl PlanService {
    pub fn new(config: ServiceConfig) -> Self {
        Self {
            invoker: PlannerInvoker::new(config.planner),
            workspaces: WorkspaceManager::new(config.workspace_root),
        }
    }

    pub fn invoker(&self) -> &PlannerInvoker {
        &self.invoker
    }

    pub fn workspaces(&self) -> &WorkspaceManager {
        &self.workspaces
    }

    /// Normalize `request` and run the planner on it.
    pub async fn plan(&self, request: &PlanRequest) -> InvocationOutcome {
        self.plan_text(&request.domain_text(), &request.problem_text())
            .await
    }

    /// Run the planner on already-normalized text.
    ///
    /// The workspace is removed on every path, including when this future
    /// is dropped before completion.
    pub async fn plan_text(&self, domain: &str, problem: &str) -> InvocationOutcome {
        let workspace = match self.workspaces.create(domain, problem) {
            Ok(ws) => ws,
            Err(e) => {
                warn!(error = %e, "workspace setup failed");
                return InvocationOutcome::ExecutionError {
                    reason: e.to_string(),
                };
            }
        };

        let outcome = self
            .invoker
            .invoke(&workspace.domain_path(), &workspace.problem_path())
            .await;

        workspace.close();
        outcome
    }
}
