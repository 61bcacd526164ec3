//! Configuration, the confidence policy and the sequential fill pass that
//! ties matching to widget interaction.

mod config;
pub mod pass;
pub mod policy;

pub use config::{
    config_schema_json, load_config, parse_config, write_schema_file, AliasesConfig, Config, MatchingConfig,
    PassSettings, RemoteConfig,
};
pub use fillkit_match::PolicyError;
pub use pass::{
    CancelHandle, FieldOutcome, FieldStatus, FieldTask, Orchestrator, PassReport, PassSummary, Recommendation,
    RecommendationKind,
};
pub use policy::{BelowThreshold, Decision, FillPolicy};
