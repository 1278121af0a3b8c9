//! Turning a clustered capacity solution into fixed decisions for the full solve.

use cem_scenarios::ScenarioConfig;
use thiserror::Error;

use crate::backend::{CapacitySolution, CapacityVariable};
use crate::error::MultiError;

/// Magnitude below which a negative capacity is treated as solver noise.
pub const NEGATIVE_TOLERANCE: f64 = 1e-6;

#[derive(Debug, Clone, Copy, PartialEq, Error)]
#[error("capacity {0} is negative beyond tolerance")]
pub struct NegativeCapacity(pub f64);

/// Round a capacity to two decimals, snapping tolerance noise in
/// `(-1e-6, 0)` to zero. Anything more negative (or NaN) is rejected.
pub fn roundup(value: f64) -> Result<f64, NegativeCapacity> {
    if value.is_nan() || value <= -NEGATIVE_TOLERANCE {
        return Err(NegativeCapacity(value));
    }
    if value < 0.0 {
        return Ok(0.0);
    }
    Ok(round_cents(value))
}

/// Round a non-negative finite value to two decimals using its exact binary
/// value, ties to even.
fn round_cents(value: f64) -> f64 {
    if !value.is_finite() {
        return value;
    }
    let bits = value.to_bits();
    let biased = ((bits >> 52) & 0x7ff) as i32;
    let fraction = bits & ((1u64 << 52) - 1);
    let (mantissa, exponent) = if biased == 0 {
        (fraction, -1074)
    } else {
        (fraction | (1u64 << 52), biased - 1075)
    };
    if exponent >= 0 {
        // already integral
        return value;
    }

    // value * 100 == scaled / 2^shift exactly; scaled < 2^60
    let scaled = mantissa * 100;
    let shift = exponent.unsigned_abs();
    if shift > 61 {
        return 0.0;
    }
    let mut cents = scaled >> shift;
    let remainder = scaled & ((1u64 << shift) - 1);
    let half = 1u64 << (shift - 1);
    if remainder > half || (remainder == half && cents % 2 == 1) {
        cents += 1;
    }
    cents as f64 / 100.0
}

/// Rounded capacity decisions for every zone and every generation, storage,
/// hybrid and retirement technology active in it.
pub fn capacity_decisions(
    config: &ScenarioConfig,
    year: u32,
    solution: &CapacitySolution,
) -> Result<CapacitySolution, MultiError> {
    let mut decisions = CapacitySolution::default();
    for variable in CapacityVariable::ALL {
        for (zone, techs) in config.techs_per_zone(variable.category()) {
            for tech in techs {
                let Some(raw) = solution.get(variable, zone, tech) else {
                    return Err(MultiError::Cluster {
                        year,
                        source: anyhow::anyhow!(
                            "decomposed solution has no value for {variable}[{zone},{tech}]"
                        ),
                    });
                };
                let value = roundup(raw).map_err(|NegativeCapacity(value)| MultiError::Anomaly {
                    year,
                    variable: variable.as_str(),
                    zone,
                    tech,
                    value,
                })?;
                decisions.insert(variable, zone, tech, value);
            }
        }
    }
    Ok(decisions)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::scenario;
    use cem_core::{TechId, ZoneId};

    #[test]
    fn rounding_policy() {
        assert_eq!(roundup(-0.000_000_5), Ok(0.0));
        assert_eq!(roundup(0.0), Ok(0.0));
        assert_eq!(roundup(1.2345), Ok(1.23));
        assert_eq!(roundup(2.0), Ok(2.0));
        assert_eq!(roundup(-1e-5), Err(NegativeCapacity(-1e-5)));
        assert!(roundup(-NEGATIVE_TOLERANCE).is_err());
        assert!(roundup(f64::NAN).is_err());
    }

    #[test]
    fn exact_ties_round_to_even() {
        assert_eq!(roundup(0.125), Ok(0.12));
        assert_eq!(roundup(0.375), Ok(0.38));
        assert_eq!(roundup(100.125), Ok(100.12));
        // 2.675 is stored just below the tie
        assert_eq!(roundup(2.675), Ok(2.67));
        // 0.135 is stored just above it
        assert_eq!(roundup(0.135), Ok(0.14));
    }

    #[test]
    fn rounding_edges() {
        assert_eq!(roundup(0.004), Ok(0.0));
        assert_eq!(roundup(0.005), Ok(0.01));
        assert_eq!(roundup(f64::MIN_POSITIVE), Ok(0.0));
        assert_eq!(
            roundup(4_503_599_627_370_496.0),
            Ok(4_503_599_627_370_496.0)
        );
        assert_eq!(roundup(1234.5678), Ok(1234.57));
    }

    #[test]
    fn decisions_cover_each_category() {
        // zone 1: ccgt (gen + retire), pumped hydro (storage), solar thermal hybrid
        let cfg = scenario(&[2020], &[(1, &[2, 17, 13])]);
        let z = ZoneId::new(1);
        let (ccgt, storage, hybrid) = (TechId::new(2), TechId::new(17), TechId::new(13));
        let mut solution = CapacitySolution::default();
        solution.insert(CapacityVariable::GenCapNew, z, ccgt, 100.456);
        solution.insert(CapacityVariable::GenCapRet, z, ccgt, -0.000_000_1);
        solution.insert(CapacityVariable::StorCapNew, z, storage, 12.0);
        solution.insert(CapacityVariable::HybCapNew, z, hybrid, 0.004);

        let decisions = capacity_decisions(&cfg, 2020, &solution).unwrap();
        assert_eq!(decisions.len(), 4);
        assert_eq!(
            decisions.get(CapacityVariable::GenCapNew, z, ccgt),
            Some(100.46)
        );
        assert_eq!(
            decisions.get(CapacityVariable::GenCapRet, z, ccgt),
            Some(0.0)
        );
        assert_eq!(
            decisions.get(CapacityVariable::StorCapNew, z, storage),
            Some(12.0)
        );
        assert_eq!(
            decisions.get(CapacityVariable::HybCapNew, z, hybrid),
            Some(0.0)
        );
    }

    #[test]
    fn negative_capacity_is_an_anomaly() {
        let cfg = scenario(&[2030], &[(3, &[14])]);
        let mut solution = CapacitySolution::default();
        solution.insert(
            CapacityVariable::GenCapNew,
            ZoneId::new(3),
            TechId::new(14),
            -0.5,
        );
        let err = capacity_decisions(&cfg, 2030, &solution).unwrap_err();
        assert!(matches!(
            err,
            MultiError::Anomaly { year: 2030, variable: "gen_cap_new", value, .. }
                if value == -0.5
        ));
    }

    #[test]
    fn missing_value_fails_the_cluster_step() {
        let cfg = scenario(&[2030], &[(3, &[14])]);
        let err = capacity_decisions(&cfg, 2030, &CapacitySolution::default()).unwrap_err();
        assert!(matches!(err, MultiError::Cluster { year: 2030, .. }));
    }
}
