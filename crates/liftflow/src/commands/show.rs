use crate::output;
use colored::Colorize;
use liftflow_cloud::StateManager;
use liftflow_core::Project;
use liftflow_gamelift::PROVIDER_NAME;

/// Print the tracked resources without contacting the provider
pub async fn handle(project: &Project, state: &StateManager) -> anyhow::Result<()> {
    let global = state.load().await?;

    println!("Project: {}", project.manifest.project.cyan());
    println!("State:   {}", state.state_path().display().to_string().cyan());
    println!(
        "Updated: {}",
        global.updated_at.format("%Y-%m-%d %H:%M:%S UTC")
    );
    println!();
    output::print_state(&global.provider_state(PROVIDER_NAME));
    Ok(())
}
