use std::path::Path;
use std::sync::Mutex;

use async_trait::async_trait;
use tempfile::tempdir;

use super::archive::test_support::write_zip;
use super::*;

fn run_async_test<F>(future: F) -> AppResult<()>
where
    F: std::future::Future<Output = AppResult<()>>,
{
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|err| AppError::validation(format!("Failed to build runtime: {}", err)))?;
    runtime.block_on(future)
}

struct FakeDownloader {
    page: Option<String>,
    good_url: Option<String>,
    archive_entries: Vec<(String, Vec<u8>)>,
    requested: Mutex<Vec<String>>,
}

impl FakeDownloader {
    fn requested(&self) -> Vec<String> {
        self.requested
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl DownloadPort for FakeDownloader {
    async fn fetch_page(&self, _url: &str) -> AppResult<String> {
        self.page
            .clone()
            .ok_or_else(|| AppError::install(InstallError::from("page unavailable")))
    }

    async fn download(&self, url: &str, dest: &Path) -> AppResult<u64> {
        if let Ok(mut guard) = self.requested.lock() {
            guard.push(url.to_owned());
        }
        if self.good_url.as_deref() != Some(url) {
            return Err(AppError::install(InstallError::DownloadStatus {
                url: url.to_owned(),
                status: 404,
            }));
        }
        let entries: Vec<(&str, &[u8])> = self
            .archive_entries
            .iter()
            .map(|(name, data)| (name.as_str(), data.as_slice()))
            .collect();
        write_zip(dest, &entries).map_err(AppError::validation)?;
        Ok(0)
    }
}

/// Treats the jar as runnable once the file exists.
struct ExistsProbe {
    runtime_ok: bool,
}

#[async_trait]
impl ToolProbe for ExistsProbe {
    async fn verify_runtime(&self) -> AppResult<()> {
        if self.runtime_ok {
            return Ok(());
        }
        Err(AppError::install(InstallError::RuntimeMissing {
            runtime: "java".to_owned(),
            message: "not found".to_owned(),
        }))
    }

    async fn can_run(&self, tool_path: &Path) -> bool {
        tool_path.is_file()
    }
}

fn settings() -> ExecutorSettings {
    ExecutorSettings {
        version: "3.11".to_owned(),
        download_link: "http://dl.invalid/{version}/grinder.zip".to_owned(),
        mirror_link: "http://dl.invalid/{version}/grinder.zip?use_mirror={mirror}".to_owned(),
        mirrors_page: "http://dl.invalid/mirrors/{version}".to_owned(),
        ..ExecutorSettings::default()
    }
}

fn grinder_archive() -> Vec<(String, Vec<u8>)> {
    vec![
        ("grinder-3.11/lib/grinder.jar".to_owned(), b"jar".to_vec()),
        ("grinder-3.11/lib/jython.jar".to_owned(), b"jython".to_vec()),
    ]
}

#[test]
fn runnable_tool_skips_download() -> AppResult<()> {
    let dir = tempdir()?;
    let jar = dir.path().join("grinder-taurus").join("lib").join("grinder.jar");
    std::fs::create_dir_all(dir.path().join("grinder-taurus").join("lib"))?;
    std::fs::write(&jar, b"jar")?;
    run_async_test(async move {
        let downloader = FakeDownloader {
            page: None,
            good_url: None,
            archive_entries: Vec::new(),
            requested: Mutex::new(Vec::new()),
        };
        let installer = ToolInstaller::new(jar, &settings(), downloader, ExistsProbe { runtime_ok: true });
        let outcome = installer.ensure_installed().await?;
        if outcome != InstallOutcome::AlreadyInstalled {
            return Err(AppError::validation(format!("Unexpected outcome: {:?}", outcome)));
        }
        if !installer.downloader.requested().is_empty() {
            return Err(AppError::validation("No download expected"));
        }
        Ok(())
    })
}

#[test]
fn falls_through_to_next_mirror() -> AppResult<()> {
    let dir = tempdir()?;
    let jar = dir.path().join("grinder-taurus").join("lib").join("grinder.jar");
    run_async_test(async move {
        let downloader = FakeDownloader {
            page: Some(r#"<li id="broken"></li><li id="good"></li>"#.to_owned()),
            good_url: Some("http://dl.invalid/3.11/grinder.zip?use_mirror=good".to_owned()),
            archive_entries: grinder_archive(),
            requested: Mutex::new(Vec::new()),
        };
        let installer = ToolInstaller::new(jar.clone(), &settings(), downloader, ExistsProbe { runtime_ok: true });
        let outcome = installer.ensure_installed().await?;
        let expected = InstallOutcome::Installed {
            url: "http://dl.invalid/3.11/grinder.zip?use_mirror=good".to_owned(),
        };
        if outcome != expected {
            return Err(AppError::validation(format!("Unexpected outcome: {:?}", outcome)));
        }
        let requested = installer.downloader.requested();
        if requested.len() != 2 {
            return Err(AppError::validation(format!("Unexpected requests: {:?}", requested)));
        }
        if !jar.is_file() {
            return Err(AppError::validation("Jar was not extracted"));
        }
        let jython = jar.with_file_name("jython.jar");
        if !jython.is_file() {
            return Err(AppError::validation("Sibling jar was not extracted"));
        }
        Ok(())
    })
}

#[test]
fn all_mirrors_failing_lists_attempts() -> AppResult<()> {
    let dir = tempdir()?;
    let jar = dir.path().join("grinder-taurus").join("lib").join("grinder.jar");
    run_async_test(async move {
        let downloader = FakeDownloader {
            page: Some(r#"<li id="one"></li>"#.to_owned()),
            good_url: None,
            archive_entries: Vec::new(),
            requested: Mutex::new(Vec::new()),
        };
        let installer = ToolInstaller::new(jar, &settings(), downloader, ExistsProbe { runtime_ok: true });
        match installer.ensure_installed().await {
            Err(AppError::Install(InstallError::ToolUnavailable { attempted, .. })) => {
                if attempted.len() != 2 {
                    return Err(AppError::validation(format!("Unexpected attempts: {:?}", attempted)));
                }
                if attempted.last().map(String::as_str) != Some("http://dl.invalid/3.11/grinder.zip") {
                    return Err(AppError::validation("Canonical link must be tried last"));
                }
                Ok(())
            }
            other => Err(AppError::validation(format!("Unexpected result: {:?}", other))),
        }
    })
}

#[test]
fn page_failure_still_tries_canonical() -> AppResult<()> {
    let dir = tempdir()?;
    let jar = dir.path().join("grinder-taurus").join("lib").join("grinder.jar");
    run_async_test(async move {
        let downloader = FakeDownloader {
            page: None,
            good_url: Some("http://dl.invalid/3.11/grinder.zip".to_owned()),
            archive_entries: grinder_archive(),
            requested: Mutex::new(Vec::new()),
        };
        let installer = ToolInstaller::new(jar, &settings(), downloader, ExistsProbe { runtime_ok: true });
        installer.ensure_installed().await?;
        if installer.downloader.requested() != vec!["http://dl.invalid/3.11/grinder.zip".to_owned()] {
            return Err(AppError::validation("Expected canonical download only"));
        }
        Ok(())
    })
}

#[test]
fn archive_without_jar_fails_reverify() -> AppResult<()> {
    let dir = tempdir()?;
    let jar = dir.path().join("grinder-taurus").join("lib").join("grinder.jar");
    run_async_test(async move {
        let downloader = FakeDownloader {
            page: None,
            good_url: Some("http://dl.invalid/3.11/grinder.zip".to_owned()),
            archive_entries: vec![("grinder-3.11/README".to_owned(), b"readme".to_vec())],
            requested: Mutex::new(Vec::new()),
        };
        let installer = ToolInstaller::new(jar, &settings(), downloader, ExistsProbe { runtime_ok: true });
        match installer.ensure_installed().await {
            Err(AppError::Install(InstallError::Installation { .. })) => Ok(()),
            other => Err(AppError::validation(format!("Unexpected result: {:?}", other))),
        }
    })
}

#[test]
fn missing_runtime_stops_early() -> AppResult<()> {
    let dir = tempdir()?;
    let jar = dir.path().join("lib").join("grinder.jar");
    run_async_test(async move {
        let downloader = FakeDownloader {
            page: None,
            good_url: None,
            archive_entries: Vec::new(),
            requested: Mutex::new(Vec::new()),
        };
        let installer = ToolInstaller::new(jar, &settings(), downloader, ExistsProbe { runtime_ok: false });
        match installer.ensure_installed().await {
            Err(AppError::Install(InstallError::RuntimeMissing { .. })) => Ok(()),
            other => Err(AppError::validation(format!("Unexpected result: {:?}", other))),
        }
    })
}
