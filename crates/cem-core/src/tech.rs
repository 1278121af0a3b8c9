//! Default identifier sets and the technology classification.
//!
//! These are the sets a scenario uses when it does not override
//! `regions`, `zones` or `all_tech`. The category tables drive the
//! per-zone technology listings written into every year template.

use crate::{RegionId, TechId, ZoneId};

/// First year for which input data exists.
pub const MIN_YEAR: u32 = 2018;
/// Last full (financial) year of input data.
pub const MAX_YEAR: u32 = 2050;
/// Year preceding the first investment period, used as its "previous year".
pub const FIRST_YEAR_BASELINE: u32 = 2017;

const fn techs<const N: usize>(ids: [u32; N]) -> [TechId; N] {
    let mut out = [TechId::new(0); N];
    let mut i = 0;
    while i < N {
        out[i] = TechId::new(ids[i]);
        i += 1;
    }
    out
}

/// NEM regions: (id, name).
pub const REGIONS: &[(RegionId, &str)] = &[
    (RegionId::new(1), "NSW"),
    (RegionId::new(2), "QLD"),
    (RegionId::new(3), "SA"),
    (RegionId::new(4), "TAS"),
    (RegionId::new(5), "VIC"),
];

/// Planning zones: (id, name, owning region).
pub const ZONES: &[(ZoneId, &str, RegionId)] = &[
    (ZoneId::new(1), "NQ", RegionId::new(2)),
    (ZoneId::new(2), "CQ", RegionId::new(2)),
    (ZoneId::new(3), "SEQ", RegionId::new(2)),
    (ZoneId::new(4), "SWQ", RegionId::new(2)),
    (ZoneId::new(5), "NNS", RegionId::new(1)),
    (ZoneId::new(6), "NCEN", RegionId::new(1)),
    (ZoneId::new(7), "CAN", RegionId::new(1)),
    (ZoneId::new(8), "SWNSW", RegionId::new(1)),
    (ZoneId::new(9), "NVIC", RegionId::new(5)),
    (ZoneId::new(10), "LV", RegionId::new(5)),
    (ZoneId::new(11), "MEL", RegionId::new(5)),
    (ZoneId::new(12), "CVIC", RegionId::new(5)),
    (ZoneId::new(13), "NSA", RegionId::new(3)),
    (ZoneId::new(14), "ADE", RegionId::new(3)),
    (ZoneId::new(15), "SESA", RegionId::new(3)),
    (ZoneId::new(16), "TAS", RegionId::new(4)),
];

/// Technology catalogue: (id, name).
pub const TECH_TYPES: &[(TechId, &str)] = &[
    (TechId::new(1), "biomass"),
    (TechId::new(2), "ccgt"),
    (TechId::new(3), "ccgt_sc"),
    (TechId::new(4), "coal_sc"),
    (TechId::new(5), "coal_sc_scc"),
    (TechId::new(6), "brown_coal_sc"),
    (TechId::new(7), "brown_coal_sc_scc"),
    (TechId::new(8), "ocgt"),
    (TechId::new(9), "pv_dat"),
    (TechId::new(10), "pv_fixed"),
    (TechId::new(11), "pv_sat"),
    (TechId::new(12), "recip_engine"),
    (TechId::new(13), "solar_thermal_6h"),
    (TechId::new(14), "wind"),
    (TechId::new(15), "hydro"),
    (TechId::new(16), "gas_thermal"),
    (TechId::new(17), "pumped_hydro"),
    (TechId::new(18), "wind_high"),
    (TechId::new(19), "solar_thermal_15h"),
    (TechId::new(20), "battery_2h"),
    (TechId::new(21), "battery_4h"),
];

static FUEL_TECH: [TechId; 10] = techs([1, 2, 3, 4, 5, 6, 7, 8, 12, 16]);
static COMMIT_TECH: [TechId; 7] = techs([2, 3, 4, 5, 6, 7, 16]);
static RE_GEN_TECH: [TechId; 7] = techs([1, 9, 10, 11, 14, 15, 18]);
static DISP_GEN_TECH: [TechId; 11] = techs([1, 2, 3, 4, 5, 6, 7, 8, 12, 15, 16]);
static RE_DISP_GEN_TECH: [TechId; 2] = techs([1, 15]);
static HYB_TECH: [TechId; 2] = techs([13, 19]);
static GEN_TECH: [TechId; 16] = techs([1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 14, 15, 16, 18]);
static STOR_TECH: [TechId; 3] = techs([17, 20, 21]);
static RETIRE_TECH: [TechId; 6] = techs([2, 4, 6, 8, 12, 16]);
static NOBUILD_TECH: [TechId; 4] = techs([4, 6, 15, 16]);

/// Fixed classification of the technology catalogue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TechCategory {
    /// Burns a fuel with a heat rate and emission factor.
    Fuel,
    /// Subject to unit commitment.
    Commit,
    /// Renewable generation.
    RenewableGen,
    /// Dispatchable generation.
    DispatchableGen,
    /// Renewable and dispatchable.
    RenewableDispatchableGen,
    /// Generation coupled with storage (e.g. solar thermal).
    Hybrid,
    /// Plain generation.
    Generation,
    /// Storage.
    Storage,
    /// Existing plant that may be retired endogenously.
    Retire,
    /// No new build allowed.
    NoBuild,
}

impl TechCategory {
    pub const ALL: [TechCategory; 10] = [
        TechCategory::Fuel,
        TechCategory::Commit,
        TechCategory::RenewableGen,
        TechCategory::DispatchableGen,
        TechCategory::RenewableDispatchableGen,
        TechCategory::Hybrid,
        TechCategory::Generation,
        TechCategory::Storage,
        TechCategory::Retire,
        TechCategory::NoBuild,
    ];

    /// Catalogue members, in catalogue order.
    pub fn members(&self) -> &'static [TechId] {
        match self {
            TechCategory::Fuel => &FUEL_TECH,
            TechCategory::Commit => &COMMIT_TECH,
            TechCategory::RenewableGen => &RE_GEN_TECH,
            TechCategory::DispatchableGen => &DISP_GEN_TECH,
            TechCategory::RenewableDispatchableGen => &RE_DISP_GEN_TECH,
            TechCategory::Hybrid => &HYB_TECH,
            TechCategory::Generation => &GEN_TECH,
            TechCategory::Storage => &STOR_TECH,
            TechCategory::Retire => &RETIRE_TECH,
            TechCategory::NoBuild => &NOBUILD_TECH,
        }
    }

    pub fn contains(&self, tech: TechId) -> bool {
        self.members().contains(&tech)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TechCategory::Fuel => "fuel",
            TechCategory::Commit => "commit",
            TechCategory::RenewableGen => "regen",
            TechCategory::DispatchableGen => "dispgen",
            TechCategory::RenewableDispatchableGen => "redispgen",
            TechCategory::Hybrid => "hyb",
            TechCategory::Generation => "gen",
            TechCategory::Storage => "stor",
            TechCategory::Retire => "retire",
            TechCategory::NoBuild => "nobuild",
        }
    }
}

pub fn default_regions() -> Vec<RegionId> {
    REGIONS.iter().map(|(id, _)| *id).collect()
}

pub fn default_zones() -> Vec<ZoneId> {
    ZONES.iter().map(|(id, _, _)| *id).collect()
}

pub fn default_techs() -> Vec<TechId> {
    TECH_TYPES.iter().map(|(id, _)| *id).collect()
}

pub fn tech_name(tech: TechId) -> Option<&'static str> {
    TECH_TYPES
        .iter()
        .find(|(id, _)| *id == tech)
        .map(|(_, name)| *name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_category_member_is_in_the_catalogue() {
        for category in TechCategory::ALL {
            for tech in category.members() {
                assert!(
                    tech_name(*tech).is_some(),
                    "{} member {tech} missing from catalogue",
                    category.as_str()
                );
            }
        }
    }

    #[test]
    fn build_categories_are_disjoint() {
        for tech in TechCategory::Generation.members() {
            assert!(!TechCategory::Storage.contains(*tech));
            assert!(!TechCategory::Hybrid.contains(*tech));
        }
    }

    #[test]
    fn zones_belong_to_known_regions() {
        let regions = default_regions();
        assert!(ZONES.iter().all(|(_, _, region)| regions.contains(region)));
        assert_eq!(default_zones().len(), 16);
    }
}
