pub mod config;
pub mod error;
pub mod overrides;

pub use config::{
    load_config_from_path, validate, ModelOptions, PolicySeries, RawScenarioFile, ScenarioConfig,
    DEFAULT_CAPACITY_SOURCE,
};
pub use error::ConfigError;
pub use overrides::{
    CostShape, CustomCostRow, CustomCostTable, ExogenousCapacityRow, ExogenousCapacityTable,
    CUSTOM_COST_CATEGORIES, EXOGENOUS_CAPACITY_CATEGORIES,
};
