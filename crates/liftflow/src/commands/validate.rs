use colored::Colorize;
use liftflow_core::Project;
use liftflow_gamelift::{ProviderConfig, parse_desired};

/// Check the manifest offline: syntax, field values and references
pub fn handle(project: &Project, config: &ProviderConfig) -> anyhow::Result<()> {
    println!(
        "Manifest: {}",
        project.manifest_path().display().to_string().cyan()
    );

    let desired = parse_desired(&project.manifest.resources)?;

    println!("{}", "✓ Manifest is valid".green().bold());
    println!();
    println!("Project: {}", project.manifest.project.cyan());
    println!(
        "Region:  {}",
        config.region.as_deref().unwrap_or("(from AWS profile)")
    );
    println!("Fleets: {}", desired.fleets.len());
    for (name, spec) in &desired.fleets {
        println!(
            "  - {} ({} on {}, {} inbound rule(s))",
            name.cyan(),
            spec.build_id,
            spec.ec2_instance_type,
            spec.ec2_inbound_permissions.len()
        );
    }
    println!("Scaling policies: {}", desired.policies.len());
    for (name, spec) in &desired.policies {
        let target = spec
            .fleet
            .as_deref()
            .or(spec.fleet_id.as_deref())
            .unwrap_or("?");
        println!(
            "  - {} ({} {} on {})",
            name.cyan(),
            spec.policy_type,
            spec.metric_name,
            target
        );
    }
    Ok(())
}
