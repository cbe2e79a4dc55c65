//! Grinder executor lifecycle.
//!
//! `Idle -> Prepared -> Running -> {Succeeded, Failed} -> Finalized`. The host
//! drives the transitions: `prepare` once, `start` once, `poll` on a timer,
//! `stop` on teardown (always), `read_samples(true)` for the final pass and
//! then `finalize`.

mod artifacts;
mod properties;
mod script;

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::config::LoadProfile;
use crate::config::{resolve_tool_path, resolve_user_path};
use crate::config::types::{ExecutorSettings, ScenarioConfig};
use crate::error::{AppError, AppResult, ConfigError, ExecutorError};
use crate::install::{GRINDER_MAIN_CLASS, InstallPort};
use crate::process::{CommandSpec, ProcessStatus, ProcessSupervisor};
use crate::results::{ResultLogReader, Samples};

pub use artifacts::ArtifactDir;

use properties::{LayerSection, PropertiesSection, SystemSection, resolve_properties_file};

/// Result log written by the worker logging configuration.
pub const KPI_FILE_NAME: &str = "grinder-bzt-kpi.log";
const RESOURCES_DIR_NAME: &str = "grinder-resources";
const LOGBACK_FILE_NAME: &str = "logback-worker.xml";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Idle,
    Prepared,
    Running,
    Succeeded,
    Failed,
    Finalized,
}

impl LifecycleState {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            LifecycleState::Idle => "idle",
            LifecycleState::Prepared => "prepared",
            LifecycleState::Running => "running",
            LifecycleState::Succeeded => "succeeded",
            LifecycleState::Failed => "failed",
            LifecycleState::Finalized => "finalized",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    Running,
    Finished,
}

/// Everything the executor needs from the host, resolved up front.
#[derive(Debug, Clone)]
pub struct ExecutorConfig {
    pub settings: ExecutorSettings,
    pub scenario: ScenarioConfig,
    pub load: LoadProfile,
    pub stop_grace: Duration,
}

pub struct GrinderExecutor {
    settings: ExecutorSettings,
    scenario: ScenarioConfig,
    load: LoadProfile,
    stop_grace: Duration,
    tool_path: PathBuf,
    artifacts: ArtifactDir,
    state: LifecycleState,
    script: Option<PathBuf>,
    properties_file: Option<PathBuf>,
    classpath_dir: Option<PathBuf>,
    kpi_file: Option<PathBuf>,
    reader: Option<ResultLogReader>,
    supervisor: ProcessSupervisor,
    stderr_file: Option<PathBuf>,
    started_at: Option<Instant>,
}

impl GrinderExecutor {
    /// Resolves the tool path (`~` expanded, made absolute).
    ///
    /// # Errors
    ///
    /// Returns an error when the tool path cannot be resolved.
    pub fn new(config: ExecutorConfig, artifacts: ArtifactDir) -> AppResult<Self> {
        let tool_path = resolve_tool_path(&config.settings)?;
        Ok(Self {
            settings: config.settings,
            scenario: config.scenario,
            load: config.load,
            stop_grace: config.stop_grace,
            tool_path,
            artifacts,
            state: LifecycleState::Idle,
            script: None,
            properties_file: None,
            classpath_dir: None,
            kpi_file: None,
            reader: None,
            supervisor: ProcessSupervisor::default(),
            stderr_file: None,
            started_at: None,
        })
    }

    #[must_use]
    pub fn tool_path(&self) -> &Path {
        &self.tool_path
    }

    #[must_use]
    pub const fn state(&self) -> LifecycleState {
        self.state
    }

    #[must_use]
    pub const fn artifacts(&self) -> &ArtifactDir {
        &self.artifacts
    }

    #[must_use]
    pub fn properties_file(&self) -> Option<&Path> {
        self.properties_file.as_deref()
    }

    #[must_use]
    pub fn kpi_file(&self) -> Option<&Path> {
        self.kpi_file.as_deref()
    }

    fn invalid_state(&self, operation: &'static str) -> AppError {
        AppError::executor(ExecutorError::InvalidState {
            operation,
            state: self.state.as_str(),
        })
    }

    fn explicit_script(&self) -> AppResult<Option<PathBuf>> {
        self.scenario
            .script
            .as_deref()
            .filter(|value| !value.trim().is_empty())
            .map(resolve_user_path)
            .transpose()
    }

    /// Installs the tool when needed, resolves the script and writes the
    /// properties document.
    ///
    /// # Errors
    ///
    /// Returns `MissingScript` when neither a script nor requests are
    /// configured, installation errors from `installer`, and I/O errors.
    pub async fn prepare<I>(&mut self, installer: &I) -> AppResult<()>
    where
        I: InstallPort + ?Sized,
    {
        if self.state != LifecycleState::Idle {
            return Err(self.invalid_state("prepare"));
        }
        installer.ensure_installed().await?;

        let explicit = self.explicit_script()?;
        let script = match explicit.as_ref() {
            Some(path) => {
                self.artifacts.existing_artifact(path)?;
                path.clone()
            }
            None => {
                let requests = self.scenario.requests();
                if requests.is_empty() {
                    return Err(AppError::executor(ExecutorError::MissingScript));
                }
                let path = self.artifacts.create_artifact("requests", ".py");
                debug!("Generating grinder scenario: {}", path.display());
                write_file(&path, &script::synthesize(&requests), "write generated script")?;
                path
            }
        };

        let properties_file = self.artifacts.create_artifact("grinder", ".properties");
        let base_file = resolve_properties_file(self.settings.properties_file.as_deref())?;
        let scenario_file = resolve_properties_file(self.scenario.properties_file.as_deref())?;
        let base = LayerSection {
            file_title: "Base",
            inline_title: "Base",
            file: base_file.as_deref(),
            inline: &self.settings.properties,
        };
        let scenario = LayerSection {
            file_title: "Script",
            inline_title: "Scenario",
            file: scenario_file.as_deref(),
            inline: &self.scenario.properties,
        };
        let system = SystemSection {
            script: &script,
            log_directory: self.artifacts.root(),
            load: self.load,
        };
        let sections: [&dyn PropertiesSection; 3] = [&base, &scenario, &system];
        let document = properties::render(&sections)?;
        let rewrite = script::rewrite_script_path(&document, explicit.as_deref());
        write_file(&properties_file, &rewrite.contents, "write properties")?;
        debug!("Properties written: {}", properties_file.display());

        self.classpath_dir = Some(self.resolve_classpath_dir()?);
        let kpi_file = self.artifacts.root().join(KPI_FILE_NAME);
        self.reader = Some(ResultLogReader::new(kpi_file.clone()));
        self.kpi_file = Some(kpi_file);
        self.properties_file = Some(properties_file);
        self.script = Some(script);
        self.state = LifecycleState::Prepared;
        Ok(())
    }

    fn resolve_classpath_dir(&self) -> AppResult<PathBuf> {
        if let Some(dir) = self
            .settings
            .resources_dir
            .as_deref()
            .filter(|value| !value.trim().is_empty())
        {
            return resolve_user_path(dir);
        }
        let dir = self.artifacts.root().join(RESOURCES_DIR_NAME);
        std::fs::create_dir_all(&dir).map_err(|err| {
            AppError::executor(ExecutorError::Io {
                context: "create resources directory",
                source: err,
            })
        })?;
        write_file(&dir.join(LOGBACK_FILE_NAME), script::LOGBACK_WORKER, "write logging configuration")?;
        Ok(dir)
    }

    /// Launches the tool with stdout/stderr captured into artifact files.
    ///
    /// # Errors
    ///
    /// Returns an error when called out of order, when the capture files
    /// cannot be created or when the runtime cannot be spawned.
    pub fn start(&mut self) -> AppResult<()> {
        if self.state != LifecycleState::Prepared {
            return Err(self.invalid_state("start"));
        }
        let (Some(properties_file), Some(classpath_dir)) =
            (self.properties_file.clone(), self.classpath_dir.clone())
        else {
            return Err(self.invalid_state("start"));
        };
        let classpath = std::env::join_paths([classpath_dir.as_os_str(), self.tool_path.as_os_str()])
            .map_err(|err| {
                AppError::executor(ExecutorError::Io {
                    context: "build classpath",
                    source: std::io::Error::new(std::io::ErrorKind::InvalidInput, err),
                })
            })?;
        let spec = CommandSpec::new(OsString::from(&self.settings.java))
            .arg("-classpath")
            .arg(classpath)
            .arg(GRINDER_MAIN_CLASS)
            .arg(properties_file)
            .cwd(self.artifacts.root())
            .process_group(true);

        self.started_at = Some(Instant::now());
        let stdout_path = self.artifacts.create_artifact("grinder-stdout", ".log");
        let stderr_path = self.artifacts.create_artifact("grinder-stderr", ".log");
        let stdout = create_capture(&stdout_path)?;
        let stderr = create_capture(&stderr_path)?;
        self.artifacts.retain(stdout_path);
        self.artifacts.retain(stderr_path.clone());
        self.stderr_file = Some(stderr_path);

        info!("Starting Grinder: {}", spec.display());
        self.supervisor = ProcessSupervisor::start(&spec, Stdio::from(stdout), Stdio::from(stderr))?;
        self.state = LifecycleState::Running;
        Ok(())
    }

    /// Checks the process without blocking.
    ///
    /// # Errors
    ///
    /// Returns `ProcessFailed` on a non-zero exit and `EmptyResults` when the
    /// process exited cleanly without writing the result log.
    pub fn poll(&mut self) -> AppResult<PollOutcome> {
        match self.state {
            LifecycleState::Running => {}
            LifecycleState::Succeeded => return Ok(PollOutcome::Finished),
            LifecycleState::Idle
            | LifecycleState::Prepared
            | LifecycleState::Failed
            | LifecycleState::Finalized => return Err(self.invalid_state("poll")),
        }

        let code = match self.supervisor.poll()? {
            ProcessStatus::Running => return Ok(PollOutcome::Running),
            ProcessStatus::NotStarted => return Err(self.invalid_state("poll")),
            ProcessStatus::Exited(code) => code,
        };
        if code != Some(0) {
            info!("Grinder exit code: {:?}", code);
            self.state = LifecycleState::Failed;
            return Err(AppError::executor(ExecutorError::ProcessFailed {
                code,
                stderr: self.stderr_file.clone().unwrap_or_default(),
            }));
        }

        let kpi_file = self.kpi_file.clone().unwrap_or_default();
        let has_data = std::fs::metadata(&kpi_file).is_ok_and(|meta| meta.is_file() && meta.len() > 0);
        if !has_data {
            self.state = LifecycleState::Failed;
            return Err(AppError::executor(ExecutorError::EmptyResults { path: kpi_file }));
        }
        self.state = LifecycleState::Succeeded;
        Ok(PollOutcome::Finished)
    }

    /// Samples appended to the result log since the previous call.
    ///
    /// # Errors
    ///
    /// Returns an error before `prepare` or when the log header is unusable.
    pub fn read_samples(&mut self, last_pass: bool) -> AppResult<Samples<'_>> {
        match self.reader.as_mut() {
            Some(reader) => reader.produce(last_pass),
            None => Err(AppError::executor(ExecutorError::InvalidState {
                operation: "read samples",
                state: self.state.as_str(),
            })),
        }
    }

    /// Stops the process if it is still running. Safe to call in any state
    /// and more than once.
    ///
    /// # Errors
    ///
    /// Returns an error when the process cannot be terminated or reaped.
    pub async fn stop(&mut self) -> AppResult<()> {
        let result = self.supervisor.stop(self.stop_grace).await;
        if self.state == LifecycleState::Running {
            self.state = LifecycleState::Failed;
        }
        if let Some(started_at) = self.started_at.take() {
            info!("Grinder worked for {:.3} seconds", started_at.elapsed().as_secs_f64());
        }
        result.map(|_| ())
    }

    /// Registers the result log as a retained artifact and checks that the
    /// run produced at least one sample.
    ///
    /// # Errors
    ///
    /// Returns `EmptyResults` when no sample was read over the whole run.
    pub fn finalize(&mut self) -> AppResult<()> {
        if self.state == LifecycleState::Finalized {
            return Ok(());
        }
        self.state = LifecycleState::Finalized;
        if let Some(kpi_file) = self.kpi_file.clone()
            && kpi_file.is_file()
        {
            self.artifacts.retain(kpi_file);
        }
        match self.reader.as_ref() {
            Some(reader) if reader.produced() == 0 => Err(AppError::executor(ExecutorError::EmptyResults {
                path: reader.path().to_path_buf(),
            })),
            Some(_) | None => Ok(()),
        }
    }

    /// Short label for status displays.
    #[must_use]
    pub fn status_label(&self) -> Option<String> {
        let name = self.script.as_deref()?.file_name()?;
        Some(format!("Script: {}", name.to_string_lossy()))
    }

    /// Copies the files the scenario properties file depends on into the
    /// artifacts directory and returns their file names.
    ///
    /// # Errors
    ///
    /// Returns an error when the scenario properties file cannot be read or
    /// the rewritten copy cannot be written.
    pub fn resource_files(&mut self) -> AppResult<Vec<String>> {
        let Some(prop_file) = resolve_properties_file(self.scenario.properties_file.as_deref())? else {
            return Ok(Vec::new());
        };
        let contents = std::fs::read_to_string(&prop_file).map_err(|err| {
            AppError::config(ConfigError::ReadPropertiesFile {
                path: prop_file.clone(),
                source: err,
            })
        })?;
        let explicit = self.explicit_script()?;
        let rewrite = script::rewrite_script_path(&contents, explicit.as_deref());

        let mut files: Vec<PathBuf> = Vec::new();
        match rewrite.declared.as_deref() {
            None => {
                files.push(self.artifacts.existing_artifact(&prop_file)?);
            }
            Some(declared) => {
                let script = explicit.unwrap_or_else(|| relative_to(&prop_file, declared));
                self.copy_resource(&script);
                files.push(script);

                let stem = prop_file
                    .file_stem()
                    .map_or_else(|| "grinder".to_owned(), |stem| stem.to_string_lossy().into_owned());
                let suffix = prop_file
                    .extension()
                    .map_or_else(String::new, |ext| format!(".{}", ext.to_string_lossy()));
                let modified = self.artifacts.create_artifact(&stem, &suffix);
                write_file(&modified, &rewrite.contents, "write rewritten properties")?;
                self.artifacts.retain(modified.clone());
                files.push(modified);
            }
        }

        Ok(files
            .iter()
            .filter_map(|path| path.file_name())
            .map(|name| name.to_string_lossy().into_owned())
            .collect())
    }

    fn copy_resource(&self, path: &Path) {
        if !path.exists() {
            warn!("File not found: {}", path.display());
            return;
        }
        let Some(name) = path.file_name() else {
            warn!("Cannot copy file: {}", path.display());
            return;
        };
        let target = self.artifacts.root().join(name);
        if target == path {
            return;
        }
        if let Err(err) = std::fs::copy(path, &target) {
            warn!("Cannot copy file {}: {}", path.display(), err);
        }
    }
}

fn relative_to(anchor: &Path, declared: &str) -> PathBuf {
    let declared = PathBuf::from(declared);
    if declared.is_absolute() {
        return declared;
    }
    anchor
        .parent()
        .map_or_else(|| declared.clone(), |parent| parent.join(&declared))
}

fn write_file(path: &Path, contents: &str, context: &'static str) -> AppResult<()> {
    std::fs::write(path, contents).map_err(|err| {
        AppError::executor(ExecutorError::Io {
            context,
            source: err,
        })
    })
}

fn create_capture(path: &Path) -> AppResult<std::fs::File> {
    std::fs::File::create(path).map_err(|err| {
        AppError::executor(ExecutorError::Io {
            context: "create output capture",
            source: err,
        })
    })
}
