//! Capacity and cost state handed from one investment year to the next.
//!
//! The artifact field names are the model parameter names the next year's
//! template loads them into, so the JSON can be read by the model data
//! loader as-is.

use cem_core::{TechId, ZoneId};
use serde::{Deserialize, Serialize};

/// Model parameter receiving the operating generation capacity.
pub const GEN_CAP_INITIAL: &str = "gen_cap_initial";
/// Model parameter receiving the operating storage capacity.
pub const STOR_CAP_INITIAL: &str = "stor_cap_initial";
/// Model parameter receiving the operating hybrid capacity.
pub const HYB_CAP_INITIAL: &str = "hyb_cap_initial";
/// Model parameter receiving annualised capital costs per zone.
pub const COST_CAP_CARRY_FORWARD: &str = "cost_cap_carry_forward";

/// One `{"index": ..., "value": ...}` entry of an indexed model component.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Indexed<I> {
    pub index: I,
    pub value: f64,
}

impl<I> Indexed<I> {
    pub fn new(index: I, value: f64) -> Self {
        Self { index, value }
    }
}

/// End-of-year operating capacities and annualised capital costs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CarryForwardState {
    #[serde(default)]
    pub gen_cap_initial: Vec<Indexed<(ZoneId, TechId)>>,
    #[serde(default)]
    pub stor_cap_initial: Vec<Indexed<(ZoneId, TechId)>>,
    #[serde(default)]
    pub hyb_cap_initial: Vec<Indexed<(ZoneId, TechId)>>,
    #[serde(default)]
    pub cost_cap_carry_forward: Vec<Indexed<ZoneId>>,
}
