// src/adaptor/mod.rs

//! Built-in executors addressed with an `@` sigil in task lists.
//!
//! | sigil    | adaptor               |
//! |----------|-----------------------|
//! | `@sh`    | `shell`               |
//! | `@bg`    | `background-shell`    |
//! | `@npm`   | `npm-script`          |
//! | `@grunt` | `external-build-tool` |
//! | `@cb`    | `control`             |

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use anyhow::anyhow;

use crate::config::Config;
use crate::exec::{Runnable, TriggerContext};

pub mod control;
pub mod npm;
pub mod shell;

pub use control::{ControlAdaptor, ControlCommand};
pub use npm::{BuildToolAdaptor, NpmAdaptor};
pub use shell::ShellAdaptor;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum AdaptorId {
    Shell,
    BackgroundShell,
    NpmScript,
    ExternalBuildTool,
    Control,
}

impl AdaptorId {
    pub const ALL: [AdaptorId; 5] = [
        AdaptorId::Shell,
        AdaptorId::BackgroundShell,
        AdaptorId::NpmScript,
        AdaptorId::ExternalBuildTool,
        AdaptorId::Control,
    ];

    /// Sigil including the leading `@`.
    pub fn sigil(self) -> &'static str {
        match self {
            AdaptorId::Shell => "@sh",
            AdaptorId::BackgroundShell => "@bg",
            AdaptorId::NpmScript => "@npm",
            AdaptorId::ExternalBuildTool => "@grunt",
            AdaptorId::Control => "@cb",
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            AdaptorId::Shell => "shell",
            AdaptorId::BackgroundShell => "background-shell",
            AdaptorId::NpmScript => "npm-script",
            AdaptorId::ExternalBuildTool => "external-build-tool",
            AdaptorId::Control => "control",
        }
    }

    pub fn from_sigil(sigil: &str) -> Option<AdaptorId> {
        AdaptorId::ALL.into_iter().find(|id| id.sigil() == sigil)
    }
}

impl fmt::Display for AdaptorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for AdaptorId {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AdaptorId::ALL
            .into_iter()
            .find(|id| id.name() == s || id.sigil() == s)
            .ok_or_else(|| anyhow!("unknown adaptor '{s}'"))
    }
}

/// A category of external command.
pub trait Adaptor: Send + Sync + fmt::Debug {
    fn id(&self) -> AdaptorId;

    /// Whether `command` (the text after the sigil) is acceptable.
    fn validate(&self, command: &str, config: &Config) -> bool;

    fn create(&self, command: &str, trigger: &TriggerContext) -> Arc<dyn Runnable>;
}

/// The fixed set of adaptors, keyed by id.
#[derive(Debug, Clone)]
pub struct AdaptorRegistry {
    adaptors: BTreeMap<AdaptorId, Arc<dyn Adaptor>>,
}

impl Default for AdaptorRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl AdaptorRegistry {
    pub fn with_defaults() -> Self {
        let adaptors: [Arc<dyn Adaptor>; 5] = [
            Arc::new(ShellAdaptor::foreground()),
            Arc::new(ShellAdaptor::background()),
            Arc::new(NpmAdaptor),
            Arc::new(BuildToolAdaptor),
            Arc::new(ControlAdaptor),
        ];
        Self {
            adaptors: adaptors.into_iter().map(|a| (a.id(), a)).collect(),
        }
    }

    /// Look up by sigil (`@sh`).
    pub fn get(&self, sigil: &str) -> Option<&Arc<dyn Adaptor>> {
        AdaptorId::from_sigil(sigil).and_then(|id| self.adaptors.get(&id))
    }

    pub fn by_id(&self, id: AdaptorId) -> Option<&Arc<dyn Adaptor>> {
        self.adaptors.get(&id)
    }

    pub fn create(
        &self,
        id: AdaptorId,
        command: &str,
        trigger: &TriggerContext,
    ) -> anyhow::Result<Arc<dyn Runnable>> {
        self.by_id(id)
            .map(|a| a.create(command, trigger))
            .ok_or_else(|| anyhow!("adaptor '{id}' is not registered"))
    }
}
