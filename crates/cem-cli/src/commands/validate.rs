use std::path::Path;

use anyhow::{Context, Result};
use cem_core::TechCategory;
use cem_scenarios::load_config_from_path;

pub fn handle(config: &Path) -> Result<()> {
    let scenario = load_config_from_path(config)
        .with_context(|| format!("validating scenario '{}'", config.display()))?;

    println!("Scenario '{}' validated successfully", scenario.name);
    println!("  Years         : {:?}", scenario.years);
    println!("  Discount rate : {}", scenario.discount_rate);
    println!("  Template      : {}", scenario.template.display());
    println!(
        "  Sets          : {} regions, {} zones, {} technologies",
        scenario.regions.len(),
        scenario.zones.len(),
        scenario.all_tech.len()
    );
    let gen_pairs: usize = scenario
        .techs_per_zone(TechCategory::Generation)
        .values()
        .map(Vec::len)
        .sum();
    println!("  Generation    : {gen_pairs} zone/technology pairs");
    match (scenario.cluster, scenario.cluster_sets) {
        (true, Some(k)) => println!("  Clustering    : {k} representative periods"),
        _ => println!("  Clustering    : off"),
    }

    let options = scenario.model_options();
    let active: Vec<&str> = [
        ("nem_ret_ratio", options.nem_ret_ratio),
        ("nem_ret_gwh", options.nem_ret_gwh),
        ("region_ret_ratio", options.region_ret_ratio),
        ("emitlimit", options.emitlimit),
        ("nem_disp_ratio", options.nem_disp_ratio),
        ("nem_re_disp_ratio", options.nem_re_disp_ratio),
    ]
    .into_iter()
    .filter_map(|(name, on)| on.then_some(name))
    .collect();
    if active.is_empty() {
        println!("  Policies      : none");
    } else {
        println!("  Policies      : {}", active.join(", "));
    }
    if let Some(table) = &scenario.custom_costs {
        println!("  Custom costs  : {} rows", table.rows.len());
    }
    if let Some(table) = &scenario.exogenous_capacity {
        println!("  Exogenous cap : {} rows", table.rows.len());
    }
    Ok(())
}
