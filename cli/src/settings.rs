//! Layered settings for the deployer.

use crate::arg_parser::ArgParser;
use crate::error::{DeployError, Result};
use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use watchlib::WatchConfig;

pub const DEFAULT_SETTINGS_FILE: &str = "amplify-deploy.toml";
const ENV_PREFIX: &str = "AMPLIFY_DEPLOY_";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    /// AWS region for the temporary bucket and the Amplify app.
    pub region: String,
    /// Branch created on the new app and deployed to.
    pub branch: String,
    /// HTML file to package.
    pub index_path: PathBuf,
    /// Open the app URL after a successful deployment.
    pub open_browser: bool,
    #[serde(default)]
    pub watch: WatchSettings,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WatchSettings {
    pub timeout_secs: u64,
    pub poll_interval_secs: u64,
    pub max_query_failures: u32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            region: "us-east-1".to_owned(),
            branch: "main".to_owned(),
            index_path: PathBuf::from("index.html"),
            open_browser: true,
            watch: WatchSettings::default(),
        }
    }
}

impl Default for WatchSettings {
    fn default() -> Self {
        Self {
            timeout_secs: WatchConfig::DEFAULT_TIMEOUT.as_secs(),
            poll_interval_secs: WatchConfig::DEFAULT_POLL_INTERVAL.as_secs(),
            max_query_failures: WatchConfig::DEFAULT_MAX_QUERY_FAILURES,
        }
    }
}

impl Settings {
    /// Load settings, later sources overriding earlier ones:
    /// 1. built-in defaults
    /// 2. the settings file (`amplify-deploy.toml` unless another path is given)
    /// 3. `AMPLIFY_DEPLOY_` environment variables, `__` separating nested keys
    pub fn load(file: Option<&Path>) -> Result<Self> {
        let file = file.unwrap_or_else(|| Path::new(DEFAULT_SETTINGS_FILE));
        Figment::from(Serialized::defaults(Settings::default()))
            .merge(Toml::file(file))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()
            .map_err(|e| DeployError::Config(e.to_string()))
    }

    /// Command-line flags win over every other source.
    pub fn apply_args(&mut self, args: &ArgParser) {
        if let Some(index) = &args.index {
            self.index_path = index.clone();
        }
        if let Some(region) = &args.region {
            self.region = region.clone();
        }
        if let Some(branch) = &args.branch {
            self.branch = branch.clone();
        }
        if let Some(secs) = args.timeout_secs {
            self.watch.timeout_secs = secs;
        }
        if let Some(secs) = args.poll_interval_secs {
            self.watch.poll_interval_secs = secs;
        }
        if let Some(failures) = args.max_query_failures {
            self.watch.max_query_failures = failures;
        }
        if args.no_open {
            self.open_browser = false;
        }
    }

    pub fn watch_config(&self) -> Result<WatchConfig> {
        let config = WatchConfig::new(
            Duration::from_secs(self.watch.timeout_secs),
            Duration::from_secs(self.watch.poll_interval_secs),
            self.watch.max_query_failures,
        )?;
        Ok(config)
    }
}
