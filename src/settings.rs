pub use model::*;

mod model;

use std::path::PathBuf;

use clap::Parser;
use config::builder::DefaultState;
use config::ConfigBuilder;
use validator::Validate;

use crate::error::SettingsError;
use crate::serde::split_comma_separated;

pub const ENV_PREFIX: &str = "PULUMI_EXPORTER";

/// Loads settings in increasing precedence: built-in defaults, the optional YAML configuration
/// file, `PULUMI_EXPORTER__`-prefixed environment variables, then explicit command line options.
/// The merged result is validated before it is returned.
#[tracing::instrument(level = "info", skip(options))]
pub fn load_settings(options: &CliOptions) -> Result<Settings, SettingsError> {
    let mut builder = default_settings()?;

    if let Some(config_path) = &options.config {
        tracing::info!(?config_path, "loading settings file");
        builder = builder.add_source(config::File::from(config_path.as_path()).required(true));
    }

    // E.g. `PULUMI_EXPORTER__PULUMI__MAX_CONCURRENCY=20` would set `Settings.pulumi.max_concurrency`
    builder = builder.add_source(
        config::Environment::with_prefix(ENV_PREFIX)
            .prefix_separator("__")
            .separator("__")
            .try_parsing(true),
    );

    builder = options.apply_overrides(builder)?;

    let settings: Settings = builder.build()?.try_deserialize()?;
    settings.validate()?;
    tracing::info!(?settings, "settings loaded");
    Ok(settings)
}

fn default_settings() -> Result<ConfigBuilder<DefaultState>, SettingsError> {
    let builder = config::Config::builder()
        .set_default("pulumi.api_url", DEFAULT_API_URL)?
        .set_default("pulumi.organizations", Vec::<String>::new())?
        .set_default("pulumi.max_concurrency", DEFAULT_MAX_CONCURRENCY as u64)?
        .set_default("pulumi.request_timeout_secs", DEFAULT_REQUEST_TIMEOUT_SECS)?
        .set_default("http.listen_address", DEFAULT_LISTEN_ADDRESS)?;
    Ok(builder)
}

#[derive(Debug, Clone, Default, Parser)]
#[command(
    name = "pulumi-exporter",
    version,
    about = "Exports Pulumi Cloud stack, update and organization state as Prometheus metrics."
)]
pub struct CliOptions {
    /// Path to YAML configuration file.
    #[arg(short, long, env = "PULUMI_EXPORTER_CONFIG_FILE")]
    pub config: Option<PathBuf>,

    /// Pulumi Cloud access token.
    #[arg(long, env = "PULUMI_ACCESS_TOKEN", hide_env_values = true)]
    pub access_token: Option<String>,

    /// Pulumi Cloud API URL.
    #[arg(long, env = "PULUMI_API_URL")]
    pub api_url: Option<String>,

    /// Pulumi organizations to monitor; repeat the flag or separate with commas.
    #[arg(long = "organization", env = "PULUMI_ORGANIZATIONS", value_delimiter = ',')]
    pub organizations: Vec<String>,

    /// Metrics collection interval, in seconds or as a duration such as "60s" or "1m30s".
    #[arg(long, env = "PULUMI_COLLECT_INTERVAL")]
    pub collect_interval: Option<String>,

    /// Maximum number of concurrent stack collections (1-100).
    #[arg(long, env = "PULUMI_MAX_CONCURRENCY")]
    pub max_concurrency: Option<u64>,

    /// Address to listen on for metrics and health checks.
    #[arg(long, env = "PULUMI_EXPORTER_LISTEN_ADDRESS")]
    pub listen_address: Option<String>,
}

impl CliOptions {
    fn apply_overrides(
        &self, builder: ConfigBuilder<DefaultState>,
    ) -> Result<ConfigBuilder<DefaultState>, SettingsError> {
        let mut builder = builder
            .set_override_option("pulumi.access_token", self.access_token.clone())?
            .set_override_option("pulumi.api_url", self.api_url.clone())?
            .set_override_option("pulumi.collect_interval", self.collect_interval.clone())?
            .set_override_option("pulumi.max_concurrency", self.max_concurrency)?
            .set_override_option("http.listen_address", self.listen_address.clone())?;

        let organizations = split_comma_separated(&self.organizations);
        if !organizations.is_empty() {
            builder = builder.set_override("pulumi.organizations", organizations)?;
        }

        Ok(builder)
    }
}
