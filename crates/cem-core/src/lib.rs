//! # cem-core: shared vocabulary for capacity-expansion runs
//!
//! Identifier newtypes for the spatial and technology sets of the modelled
//! network and the default technology catalogue with its category
//! classification.
//!
//! ## Identifiers
//!
//! The network is partitioned into **regions**, each region into **zones**,
//! and every zone hosts a subset of the **technology** catalogue. All three
//! are small integers in the input data, wrapped in newtypes so a zone can
//! never be passed where a technology is expected:
//!
//! ```rust
//! use cem_core::{TechId, ZoneId};
//!
//! let zone = ZoneId::new(3);
//! let tech = TechId::new(14);
//! assert_eq!(format!("{zone} {tech}"), "3 14");
//! ```

pub mod tech;

pub use tech::{TechCategory, FIRST_YEAR_BASELINE, MAX_YEAR, MIN_YEAR};

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! id_newtype {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(u32);

        impl $name {
            #[inline]
            pub const fn new(value: u32) -> Self {
                $name(value)
            }
            #[inline]
            pub const fn value(&self) -> u32 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl std::str::FromStr for $name {
            type Err = std::num::ParseIntError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                s.trim().parse().map($name)
            }
        }
    };
}

id_newtype!(
    /// NEM region (state-level market region).
    RegionId
);
id_newtype!(
    /// Planning zone within a region.
    ZoneId
);
id_newtype!(
    /// Technology type from the catalogue.
    TechId
);

/// Format a floating point parameter the way the downstream data-command
/// reader expects: integral values keep a trailing `.0`.
pub fn format_param(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 && value.abs() < 1e16 {
        format!("{value:.1}")
    } else {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_parse_and_display() {
        let zone: ZoneId = " 12".parse().unwrap();
        assert_eq!(zone, ZoneId::new(12));
        assert_eq!(zone.to_string(), "12");
        assert!("x".parse::<TechId>().is_err());
    }

    #[test]
    fn ids_serialize_transparently() {
        let json = serde_json::to_string(&(ZoneId::new(4), TechId::new(2))).unwrap();
        assert_eq!(json, "[4,2]");
    }

    #[test]
    fn params_keep_decimal_point() {
        assert_eq!(format_param(1.0), "1.0");
        assert_eq!(format_param(0.5), "0.5");
        assert_eq!(format_param(0.06), "0.06");
        assert_eq!(format_param(250.0), "250.0");
    }
}
