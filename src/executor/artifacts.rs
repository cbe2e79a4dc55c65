use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::config::paths::absolute;
use crate::error::{AppError, AppResult, ExecutorError};

/// Per-run directory holding generated files and captured logs.
#[derive(Debug)]
pub struct ArtifactDir {
    root: PathBuf,
    issued: BTreeSet<PathBuf>,
    retained: Vec<PathBuf>,
}

impl ArtifactDir {
    /// Creates the directory (and parents) when missing.
    ///
    /// # Errors
    ///
    /// Returns an error when the directory cannot be created.
    pub fn create(root: &Path) -> AppResult<Self> {
        let root = absolute(root)?;
        std::fs::create_dir_all(&root).map_err(|err| {
            AppError::executor(ExecutorError::Io {
                context: "create artifacts directory",
                source: err,
            })
        })?;
        debug!("Artifacts dir: {}", root.display());
        Ok(Self {
            root,
            issued: BTreeSet::new(),
            retained: Vec::new(),
        })
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Returns a fresh path `<prefix><suffix>` inside the directory, adding
    /// `-N` before the suffix when the name is taken.
    pub fn create_artifact(&mut self, prefix: &str, suffix: &str) -> PathBuf {
        let mut candidate = self.root.join(format!("{}{}", prefix, suffix));
        let mut index: u32 = 1;
        while candidate.exists() || self.issued.contains(&candidate) {
            candidate = self.root.join(format!("{}-{}{}", prefix, index, suffix));
            index = index.saturating_add(1);
        }
        self.issued.insert(candidate.clone());
        candidate
    }

    /// Registers `path` as a run artifact, copying it in when it lives
    /// elsewhere. Returns the path inside the directory.
    ///
    /// # Errors
    ///
    /// Returns an error when the copy fails.
    pub fn existing_artifact(&mut self, path: &Path) -> AppResult<PathBuf> {
        let source = absolute(path)?;
        let target = match source.parent() {
            Some(parent) if parent == self.root => source,
            Some(_) | None => {
                let Some(name) = source.file_name() else {
                    return Err(AppError::executor(ExecutorError::Io {
                        context: "register artifact without file name",
                        source: std::io::Error::from(std::io::ErrorKind::InvalidInput),
                    }));
                };
                let target = self.root.join(name);
                std::fs::copy(&source, &target).map_err(|err| {
                    AppError::executor(ExecutorError::Io {
                        context: "copy artifact",
                        source: err,
                    })
                })?;
                target
            }
        };
        if !self.retained.contains(&target) {
            self.retained.push(target.clone());
        }
        Ok(target)
    }

    /// Registers a file that is produced inside the directory.
    pub fn retain(&mut self, path: PathBuf) {
        if !self.retained.contains(&path) {
            self.retained.push(path);
        }
    }

    #[must_use]
    pub fn retained(&self) -> &[PathBuf] {
        &self.retained
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn create_artifact_never_repeats() -> AppResult<()> {
        let dir = tempdir()?;
        let mut artifacts = ArtifactDir::create(&dir.path().join("run"))?;
        let first = artifacts.create_artifact("grinder", ".properties");
        let second = artifacts.create_artifact("grinder", ".properties");
        std::fs::write(artifacts.root().join("grinder-stdout.log"), b"")?;
        let third = artifacts.create_artifact("grinder-stdout", ".log");
        if first == second {
            return Err(AppError::validation("Artifact names must be unique"));
        }
        if second.file_name().and_then(|name| name.to_str()) != Some("grinder-1.properties") {
            return Err(AppError::validation(format!("Unexpected name: {}", second.display())));
        }
        if third.file_name().and_then(|name| name.to_str()) != Some("grinder-stdout-1.log") {
            return Err(AppError::validation(format!("Unexpected name: {}", third.display())));
        }
        Ok(())
    }

    #[test]
    fn existing_artifact_copies_outside_files() -> AppResult<()> {
        let dir = tempdir()?;
        let script = dir.path().join("scenario.py");
        std::fs::write(&script, b"# script")?;
        let mut artifacts = ArtifactDir::create(&dir.path().join("run"))?;
        let copied = artifacts.existing_artifact(&script)?;
        if copied != artifacts.root().join("scenario.py") || !copied.is_file() {
            return Err(AppError::validation("Script must be copied into the directory"));
        }
        let again = artifacts.existing_artifact(&copied)?;
        if again != copied || artifacts.retained().len() != 1 {
            return Err(AppError::validation("Artifact must be retained once"));
        }
        Ok(())
    }
}
