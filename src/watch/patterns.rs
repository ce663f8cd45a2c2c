// src/watch/patterns.rs

use std::fmt;
use std::path::{Path, PathBuf};

use anyhow::Result;
use globset::{Glob, GlobSet, GlobSetBuilder};

use crate::fs::FileSystem;
use crate::watch::error::WatchError;
use crate::watch::model::{Watcher, WatcherUid};

/// Compiled patterns of one watcher.
///
/// Patterns are relative to the project root; a leading `!` marks an
/// exclusion.
#[derive(Clone)]
pub struct WatcherProfile {
    uid: WatcherUid,
    include: GlobSet,
    exclude: Option<GlobSet>,
}

impl fmt::Debug for WatcherProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WatcherProfile")
            .field("uid", &self.uid)
            .finish_non_exhaustive()
    }
}

impl WatcherProfile {
    pub fn compile(watcher: &Watcher) -> Result<Self, WatchError> {
        let (excludes, includes): (Vec<&String>, Vec<&String>) =
            watcher.patterns.iter().partition(|p| p.starts_with('!'));

        let include = build_globset(includes.into_iter().map(String::as_str))?;
        let exclude = if excludes.is_empty() {
            None
        } else {
            Some(build_globset(excludes.into_iter().map(|p| &p[1..]))?)
        };

        Ok(Self {
            uid: watcher.uid,
            include,
            exclude,
        })
    }

    pub fn uid(&self) -> WatcherUid {
        self.uid
    }

    /// `rel_path` uses forward slashes, e.g. `"src/main.rs"`.
    pub fn matches(&self, rel_path: &str) -> bool {
        if !self.include.is_match(rel_path) {
            return false;
        }
        if let Some(exclude) = &self.exclude {
            if exclude.is_match(rel_path) {
                return false;
            }
        }
        true
    }
}

fn build_globset<'a>(patterns: impl IntoIterator<Item = &'a str>) -> Result<GlobSet, WatchError> {
    let mut builder = GlobSetBuilder::new();
    for pat in patterns {
        let glob = Glob::new(pat).map_err(|source| WatchError::InvalidPattern {
            pattern: pat.to_string(),
            source,
        })?;
        builder.add(glob);
    }
    builder.build().map_err(|source| WatchError::InvalidPattern {
        pattern: "<set>".to_string(),
        source,
    })
}

/// All files under `root` matching `profile`, sorted.
pub fn collect_matching_files(
    fs: &dyn FileSystem,
    root: &Path,
    profile: &WatcherProfile,
) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    let mut stack = vec![root.to_path_buf()];

    while let Some(dir) = stack.pop() {
        for path in fs.read_dir(&dir)? {
            if fs.is_dir(&path) {
                stack.push(path);
            } else if fs.is_file(&path) {
                if let Ok(rel) = path.strip_prefix(root) {
                    let rel_str = rel.to_string_lossy().replace('\\', "/");
                    if profile.matches(&rel_str) {
                        files.push(path);
                    }
                }
            }
        }
    }

    files.sort();
    Ok(files)
}

/// `path` relative to `root` with forward slashes.
///
/// Falls back to canonicalised paths when the plain prefix does not match
/// (symlinked temp dirs on macOS).
pub fn relative_str(root: &Path, path: &Path) -> Option<String> {
    if let Ok(rel) = path.strip_prefix(root) {
        return Some(rel.to_string_lossy().replace('\\', "/"));
    }

    let (root_canon, path_canon) = (root.canonicalize().ok()?, path.canonicalize().ok()?);
    path_canon
        .strip_prefix(&root_canon)
        .ok()
        .map(|rel| rel.to_string_lossy().replace('\\', "/"))
}
