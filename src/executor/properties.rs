use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::config::LoadProfile;
use crate::config::types::PropertyValue;
use crate::error::{AppError, AppResult, ConfigError, ExecutorError};

/// Host identifier; the KPI log name is derived from it.
pub(crate) const HOST_ID: &str = "grinder-bzt";

/// One commented block of the generated properties document.
pub(crate) trait PropertiesSection {
    /// Writes the block into `sink`. Returns `false` when there was nothing to write.
    fn write_to(&self, sink: &mut dyn Write) -> AppResult<bool>;
}

/// Optional external properties file followed by inline key/value pairs.
pub(crate) struct LayerSection<'a> {
    pub file_title: &'static str,
    pub inline_title: &'static str,
    pub file: Option<&'a Path>,
    pub inline: &'a BTreeMap<String, PropertyValue>,
}

/// Properties injected by the bridge itself; written last.
pub(crate) struct SystemSection<'a> {
    pub script: &'a Path,
    pub log_directory: &'a Path,
    pub load: LoadProfile,
}

fn sink_error(err: std::io::Error) -> AppError {
    AppError::executor(ExecutorError::Io {
        context: "write properties",
        source: err,
    })
}

impl PropertiesSection for LayerSection<'_> {
    fn write_to(&self, sink: &mut dyn Write) -> AppResult<bool> {
        let mut written = false;
        if let Some(file) = self.file {
            let contents = std::fs::read_to_string(file).map_err(|err| {
                AppError::config(ConfigError::ReadPropertiesFile {
                    path: file.to_path_buf(),
                    source: err,
                })
            })?;
            writeln!(sink, "# {} Properties File Start: {}", self.file_title, file.display())
                .map_err(sink_error)?;
            sink.write_all(contents.as_bytes()).map_err(sink_error)?;
            if !contents.is_empty() && !contents.ends_with('\n') {
                writeln!(sink).map_err(sink_error)?;
            }
            writeln!(sink, "# {} Properties File End: {}\n", self.file_title, file.display())
                .map_err(sink_error)?;
            written = true;
        }

        if !self.inline.is_empty() {
            writeln!(sink, "# {} Properties Start", self.inline_title).map_err(sink_error)?;
            for (key, value) in self.inline {
                writeln!(sink, "{}={}", key, value).map_err(sink_error)?;
            }
            writeln!(sink, "# {} Properties End\n", self.inline_title).map_err(sink_error)?;
            written = true;
        }
        Ok(written)
    }
}

impl PropertiesSection for SystemSection<'_> {
    fn write_to(&self, sink: &mut dyn Write) -> AppResult<bool> {
        writeln!(sink, "# Bridge Properties Start").map_err(sink_error)?;
        writeln!(sink, "grinder.hostID={}", HOST_ID).map_err(sink_error)?;
        writeln!(sink, "grinder.script={}", self.script.display()).map_err(sink_error)?;
        writeln!(sink, "grinder.logDirectory={}", self.log_directory.display())
            .map_err(sink_error)?;

        if let Some(concurrency) = self.load.concurrency {
            if let Some(interval) = self.load.ramp_interval_ms() {
                writeln!(sink, "grinder.processIncrementInterval={}", interval)
                    .map_err(sink_error)?;
            }
            writeln!(sink, "grinder.processes={}", concurrency).map_err(sink_error)?;
            writeln!(sink, "grinder.runs={}", self.load.iterations.unwrap_or(0))
                .map_err(sink_error)?;
            writeln!(sink, "grinder.processIncrement=1").map_err(sink_error)?;
            if let Some(duration) = self.load.duration {
                writeln!(sink, "grinder.duration={}", duration.as_millis()).map_err(sink_error)?;
            }
        }
        writeln!(sink, "# Bridge Properties End").map_err(sink_error)?;
        Ok(true)
    }
}

/// Renders the sections in order into one document.
pub(crate) fn render(sections: &[&dyn PropertiesSection]) -> AppResult<String> {
    let mut buffer: Vec<u8> = Vec::new();
    for section in sections {
        section.write_to(&mut buffer)?;
    }
    String::from_utf8(buffer).map_err(|err| {
        AppError::executor(ExecutorError::Io {
            context: "render properties",
            source: std::io::Error::new(std::io::ErrorKind::InvalidData, err),
        })
    })
}

/// Resolves an optional user-supplied properties file path.
pub(crate) fn resolve_properties_file(raw: Option<&str>) -> AppResult<Option<PathBuf>> {
    raw.filter(|value| !value.trim().is_empty())
        .map(crate::config::paths::resolve_user_path)
        .transpose()
}
