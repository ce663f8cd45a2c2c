// src/task/module.rs

//! Lookup of external task modules on disk.

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::config::ConfigSection;
use crate::fs::FileSystem;

/// A script file, or a directory whose files run as a series.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalModule {
    pub path: PathBuf,
    /// Scripts to run, in file-name order. One entry for a file module.
    pub entries: Vec<PathBuf>,
    pub is_dir: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModuleLookup {
    Found(ExternalModule),
    /// No candidate exists.
    NotFound,
    /// The name was an explicit path and nothing exists there.
    Missing(PathBuf),
}

pub struct ModuleResolver<'a> {
    fs: &'a dyn FileSystem,
    cwd: &'a Path,
    section: &'a ConfigSection,
}

impl<'a> ModuleResolver<'a> {
    pub fn new(fs: &'a dyn FileSystem, cwd: &'a Path, section: &'a ConfigSection) -> Self {
        Self { fs, cwd, section }
    }

    /// Names containing `/` or ending in `.sh` are paths relative to the
    /// working directory.
    pub fn is_path_like(name: &str) -> bool {
        name.contains('/') || name.ends_with(".sh")
    }

    /// Candidate locations in priority order.
    pub fn candidates(&self, name: &str) -> Vec<PathBuf> {
        let tasks_dir = self.cwd.join(&self.section.tasks_dir);
        vec![
            tasks_dir.join(format!("{name}.sh")),
            tasks_dir.join(name),
            self.cwd.join(format!("{name}.sh")),
            self.cwd
                .join(&self.section.bin_dir)
                .join(format!("{}{name}", self.section.module_prefix)),
        ]
    }

    pub fn lookup(&self, name: &str) -> ModuleLookup {
        if Self::is_path_like(name) {
            let path = self.cwd.join(name);
            return match self.module_at(&path) {
                Some(module) => ModuleLookup::Found(module),
                None => ModuleLookup::Missing(path),
            };
        }

        for candidate in self.candidates(name) {
            if let Some(module) = self.module_at(&candidate) {
                debug!(task = %name, path = ?candidate, "resolved external module");
                return ModuleLookup::Found(module);
            }
        }
        ModuleLookup::NotFound
    }

    fn module_at(&self, path: &Path) -> Option<ExternalModule> {
        if self.fs.is_file(path) {
            return Some(ExternalModule {
                path: path.to_path_buf(),
                entries: vec![path.to_path_buf()],
                is_dir: false,
            });
        }
        if self.fs.is_dir(path) {
            let entries = self
                .fs
                .read_dir(path)
                .map(|entries| entries.into_iter().filter(|p| self.fs.is_file(p)).collect())
                .unwrap_or_default();
            return Some(ExternalModule {
                path: path.to_path_buf(),
                entries,
                is_dir: true,
            });
        }
        None
    }
}
