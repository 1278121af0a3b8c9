//! Scenario values shared by the unit tests.

use cem_core::{RegionId, TechId, ZoneId};
use cem_scenarios::{PolicySeries, ScenarioConfig, DEFAULT_CAPACITY_SOURCE};
use std::collections::BTreeMap;
use std::path::PathBuf;

pub(crate) fn scenario(years: &[u32], per_zone: &[(u32, &[u32])]) -> ScenarioConfig {
    let all_tech_per_zone: BTreeMap<ZoneId, Vec<TechId>> = per_zone
        .iter()
        .map(|(z, ts)| (ZoneId::new(*z), ts.iter().map(|t| TechId::new(*t)).collect()))
        .collect();
    let mut all_tech: Vec<TechId> = all_tech_per_zone.values().flatten().copied().collect();
    all_tech.sort();
    all_tech.dedup();
    ScenarioConfig {
        source_path: PathBuf::from("/scenarios/base.toml"),
        name: "base".into(),
        description: None,
        years: years.to_vec(),
        discount_rate: 0.06,
        template: PathBuf::from("/scenarios/template.dat"),
        policies: PolicySeries::default(),
        custom_costs: None,
        exogenous_capacity: None,
        cluster: false,
        cluster_sets: None,
        regions: vec![RegionId::new(1)],
        zones: all_tech_per_zone.keys().copied().collect(),
        all_tech,
        all_tech_per_zone,
        capacity_source: DEFAULT_CAPACITY_SOURCE.into(),
    }
}
