//! `optic run <domain> <problem>`: invoke the planner once, locally, through
//! the same workspace and response path the HTTP service uses.

use std::path::Path;

use anyhow::{Context, Result};

use optic_core::{PlanService, ServiceConfig};

use crate::response::{Reply, build_response};

/// Run the planner on two PDDL files and print the response envelope.
///
/// Returns whether the run would have been an HTTP 200.
pub async fn run_once(config: ServiceConfig, domain: &Path, problem: &Path) -> Result<bool> {
    let reply = plan_files(config, domain, problem).await?;
    let json =
        serde_json::to_string_pretty(&reply.body).context("failed to serialize response")?;
    println!("{json}");
    Ok(reply.is_success())
}

async fn plan_files(config: ServiceConfig, domain: &Path, problem: &Path) -> Result<Reply> {
    let domain_text = std::fs::read_to_string(domain)
        .with_context(|| format!("failed to read domain file {}", domain.display()))?;
    let problem_text = std::fs::read_to_string(problem)
        .with_context(|| format!("failed to read problem file {}", problem.display()))?;

    let service = PlanService::new(config);
    Ok(build_response(
        service.plan_text(&domain_text, &problem_text).await,
    ))
}
