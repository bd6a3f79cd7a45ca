//! File Collector
//!
//! Walks the policy root and yields the non-empty policy documents found
//! under it. Missing roots, empty files and unreadable files are reported
//! and skipped; collection itself never fails.

use crate::config::PolicySourceConfig;
use crate::policy::types::PolicyDocument;
use crate::report::{LoadEvent, ProgressReporter};
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

pub struct FileCollector<'r> {
    root: PathBuf,
    extension: String,
    reporter: &'r dyn ProgressReporter,
}

impl<'r> FileCollector<'r> {
    pub fn new(config: &PolicySourceConfig, reporter: &'r dyn ProgressReporter) -> Self {
        Self {
            root: config.root.clone(),
            extension: config.extension.clone(),
            reporter,
        }
    }

    /// List policy file paths under the root, sorted by file name per directory.
    pub fn discover(&self) -> Vec<PathBuf> {
        if !self.root.is_dir() {
            self.reporter.record(LoadEvent::RootMissing {
                root: self.root.clone(),
            });
            return Vec::new();
        }

        let mut paths = Vec::new();
        for entry in WalkDir::new(&self.root).sort_by_file_name() {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    let path = e
                        .path()
                        .map(|p| self.relative_path(p))
                        .unwrap_or_else(|| self.root.display().to_string());
                    self.reporter.record(LoadEvent::ReadFailed {
                        path,
                        error: e.to_string(),
                    });
                    continue;
                }
            };

            if entry.path().is_file() && self.has_policy_extension(entry.path()) {
                paths.push(entry.into_path());
            }
        }

        self.reporter.record(LoadEvent::FilesFound {
            root: self.root.clone(),
            count: paths.len(),
        });
        paths
    }

    /// Lazily read every discovered file, skipping empty and unreadable ones.
    #[cfg(test)]
    pub fn documents(&self) -> impl Iterator<Item = PolicyDocument> + '_ {
        self.discover()
            .into_iter()
            .filter_map(move |path| self.read(&path))
    }

    /// Read a single policy file.
    pub fn read(&self, path: &Path) -> Option<PolicyDocument> {
        let relative = self.relative_path(path);
        self.reporter.record(LoadEvent::Processing {
            path: relative.clone(),
        });

        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) => {
                self.reporter.record(LoadEvent::ReadFailed {
                    path: relative,
                    error: e.to_string(),
                });
                return None;
            }
        };

        if content.trim().is_empty() {
            self.reporter
                .record(LoadEvent::SkippedEmpty { path: relative });
            return None;
        }

        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();

        Some(PolicyDocument {
            path: relative,
            stem,
            content,
        })
    }

    fn has_policy_extension(&self, path: &Path) -> bool {
        path.extension().and_then(|e| e.to_str()) == Some(self.extension.as_str())
    }

    fn relative_path(&self, path: &Path) -> String {
        let relative = path.strip_prefix(&self.root).unwrap_or(path);
        relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/")
    }
}
