//! Terminal rendering for plans, apply results and state

use colored::{ColoredString, Colorize};
use liftflow_cloud::{ActionType, ApplyResult, Plan, ProviderState, ResourceStatus};

fn colored_symbol(action_type: ActionType) -> ColoredString {
    let symbol = action_type.symbol();
    match action_type {
        ActionType::Create => symbol.green().bold(),
        ActionType::Update => symbol.yellow().bold(),
        ActionType::Replace => symbol.magenta().bold(),
        ActionType::Delete => symbol.red().bold(),
        ActionType::NoOp => symbol.normal(),
    }
}

pub fn print_plan(plan: &Plan) {
    if !plan.has_changes {
        println!("{}", "No changes. Remote resources match the manifest.".green());
        return;
    }

    println!("{}", "Planned changes:".bold());
    for action in &plan.actions {
        if action.action_type == ActionType::NoOp {
            continue;
        }
        println!(
            "  {:>3} {}",
            colored_symbol(action.action_type),
            action.resource_key().cyan()
        );
        println!("      {}", action.description.dimmed());
        if let Some(changes) = action.detail::<Vec<String>>("changes") {
            for change in changes {
                println!("        • {}", change);
            }
        }
    }
    println!();
    println!("{} {}", "Plan:".bold(), plan.summary());
}

pub fn print_apply_result(result: &ApplyResult) {
    for ok in &result.succeeded {
        println!("  {} {}", "✓".green(), ok.message);
    }
    for failed in &result.failed {
        println!(
            "  {} {}: {}",
            "✗".red(),
            failed.action_id,
            failed.error.as_deref().unwrap_or("unknown error")
        );
    }
    println!();
    let summary = format!(
        "{} succeeded, {} failed in {:.1}s",
        result.succeeded.len(),
        result.failed.len(),
        result.duration_ms as f64 / 1000.0
    );
    if result.is_success() {
        println!("{}", summary.green().bold());
    } else {
        println!("{}", summary.red().bold());
    }
}

fn colored_status(status: &ResourceStatus) -> ColoredString {
    let text = status.to_string();
    match status {
        ResourceStatus::Active => text.green(),
        ResourceStatus::Creating | ResourceStatus::Updating => text.yellow(),
        ResourceStatus::Deleting | ResourceStatus::Error => text.red(),
        ResourceStatus::Unknown => text.dimmed(),
    }
}

pub fn print_state(state: &ProviderState) {
    if state.is_empty() {
        println!("{}", "No resources tracked.".dimmed());
        return;
    }

    for (key, resource) in state.iter() {
        println!(
            "  {} {} ({})",
            key.cyan(),
            resource.id,
            colored_status(&resource.status)
        );
        println!(
            "      created {}  updated {}",
            resource.created_at.format("%Y-%m-%d %H:%M:%S UTC"),
            resource.updated_at.format("%Y-%m-%d %H:%M:%S UTC")
        );
    }
}
