use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

use crate::error::ValidationError;

/// Grinder release installed when the tool is missing.
pub const GRINDER_VERSION: &str = "3.11";

/// Direct download link; `{version}` is substituted.
pub const DOWNLOAD_LINK: &str = "http://sourceforge.net/projects/grinder/files/The%20Grinder%203/{version}/grinder-{version}-binary.zip/download";

/// Per-mirror download link; `{version}` and `{mirror}` are substituted.
pub const MIRROR_LINK: &str = "http://sourceforge.net/projects/grinder/files/The%20Grinder%203/{version}/grinder-{version}-binary.zip/download?use_mirror={mirror}";

/// Page listing the available mirrors; `{version}` is substituted.
pub const MIRRORS_PAGE: &str = "http://sourceforge.net/settings/mirror_choices?projectname=grinder&filename=The%20Grinder%203/{version}/grinder-{version}-binary.zip&dialog=true";

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct RunFile {
    #[serde(default)]
    pub executor: ExecutorSettings,
    #[serde(default)]
    pub scenario: ScenarioConfig,
    #[serde(default)]
    pub load: LoadConfig,
    #[serde(default)]
    pub hooks: HooksConfig,
    pub artifacts_dir: Option<String>,
    pub poll_interval: Option<DurationValue>,
}

/// Settings handed to the executor at construction.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct ExecutorSettings {
    /// Location of `grinder.jar`; `~` is expanded.
    pub path: Option<String>,
    /// Inline base properties.
    pub properties: BTreeMap<String, PropertyValue>,
    /// External base properties file copied verbatim before the inline ones.
    pub properties_file: Option<String>,
    /// Extra classpath directory placed before the tool jar.
    pub resources_dir: Option<String>,
    pub java: String,
    pub version: String,
    pub download_link: String,
    pub mirror_link: String,
    pub mirrors_page: String,
    pub download_timeout: Option<DurationValue>,
    pub stop_grace: Option<DurationValue>,
}

impl Default for ExecutorSettings {
    fn default() -> Self {
        Self {
            path: None,
            properties: BTreeMap::new(),
            properties_file: None,
            resources_dir: None,
            java: "java".to_owned(),
            version: GRINDER_VERSION.to_owned(),
            download_link: DOWNLOAD_LINK.to_owned(),
            mirror_link: MIRROR_LINK.to_owned(),
            mirrors_page: MIRRORS_PAGE.to_owned(),
            download_timeout: None,
            stop_grace: None,
        }
    }
}

#[derive(Debug, Default, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct ScenarioConfig {
    pub script: Option<String>,
    pub requests: Vec<RequestConfig>,
    pub properties: BTreeMap<String, PropertyValue>,
    pub properties_file: Option<String>,
}

impl ScenarioConfig {
    #[must_use]
    pub fn requests(&self) -> Vec<RequestSpec> {
        self.requests.iter().map(RequestConfig::to_spec).collect()
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RequestConfig {
    Url(String),
    Detailed { url: String, method: Option<String> },
}

impl RequestConfig {
    fn to_spec(&self) -> RequestSpec {
        match self {
            RequestConfig::Url(url) => RequestSpec {
                method: "GET".to_owned(),
                url: url.clone(),
            },
            RequestConfig::Detailed { url, method } => RequestSpec {
                method: method
                    .as_deref()
                    .map_or_else(|| "GET".to_owned(), str::to_ascii_uppercase),
                url: url.clone(),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestSpec {
    pub method: String,
    pub url: String,
}

/// A property value as written in TOML/JSON; rendered verbatim after `=`.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum PropertyValue {
    Text(String),
    Integer(i64),
    Float(f64),
    Bool(bool),
}

impl fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyValue::Text(value) => f.write_str(value),
            PropertyValue::Integer(value) => write!(f, "{}", value),
            PropertyValue::Float(value) => write!(f, "{}", value),
            PropertyValue::Bool(value) => write!(f, "{}", value),
        }
    }
}

#[derive(Debug, Default, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct LoadConfig {
    pub concurrency: Option<u64>,
    pub ramp_up: Option<DurationValue>,
    #[serde(alias = "hold-for")]
    pub duration: Option<DurationValue>,
    pub iterations: Option<u64>,
}

#[derive(Debug, Default, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct HooksConfig {
    pub prepare: Vec<HookTaskConfig>,
    pub startup: Vec<HookTaskConfig>,
    pub check: Vec<HookTaskConfig>,
    pub shutdown: Vec<HookTaskConfig>,
    pub post_process: Vec<HookTaskConfig>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum HookTaskConfig {
    Command(String),
    Detailed(HookTaskSpec),
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub struct HookTaskSpec {
    pub command: String,
    #[serde(default)]
    pub background: bool,
    #[serde(default)]
    pub ignore_failure: bool,
    pub out: Option<PathBuf>,
    pub err: Option<PathBuf>,
}

impl HookTaskConfig {
    #[must_use]
    pub fn to_spec(&self) -> HookTaskSpec {
        match self {
            HookTaskConfig::Command(command) => HookTaskSpec {
                command: command.clone(),
                background: false,
                ignore_failure: false,
                out: None,
                err: None,
            },
            HookTaskConfig::Detailed(spec) => spec.clone(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum DurationValue {
    Seconds(u64),
    Text(String),
}

impl DurationValue {
    pub(crate) fn to_duration(&self) -> Result<Duration, ValidationError> {
        match self {
            DurationValue::Seconds(0) => Err(ValidationError::DurationZero),
            DurationValue::Seconds(secs) => Ok(Duration::from_secs(*secs)),
            DurationValue::Text(text) => super::parse_duration_value(text),
        }
    }

    /// Like `to_duration`, but zero (`0`, `"0s"`) is a valid value.
    pub(crate) fn to_duration_or_zero(&self) -> Result<Duration, ValidationError> {
        match self.to_duration() {
            Err(ValidationError::DurationZero) => Ok(Duration::ZERO),
            other => other,
        }
    }
}
