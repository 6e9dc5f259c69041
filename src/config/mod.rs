//! Configuration models: test matrix, model profiles and environment handling.

pub mod env;
pub mod matrix;
pub mod profiles;

pub use env::{
    apply_offline_defaults, load_dotenv, parse_env_overrides, render_env, EnvMap, EnvValue,
    OFFLINE_ENV_DEFAULTS,
};
pub use matrix::{CommandSpec, SuiteConfig, TestMatrix};
pub use profiles::{
    KvCalibrationSection, ModelProfile, ProfileBook, ServeSection, DEFAULT_SERVE_ENTRYPOINT,
};
