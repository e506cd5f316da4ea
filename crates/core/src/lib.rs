pub mod config;
pub mod dataset;
pub mod error;
pub mod record;
pub mod schema;

pub use config::{Config, EngineConfig, ImputationConfig, IoConfig, UndefinedPolicy};
pub use dataset::Dataset;
pub use error::*;
pub use record::{FeatureMask, Record};
pub use schema::{Feature, FeatureSchema, FeatureType};
