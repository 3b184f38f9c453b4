//! Plugin loader - Builds the command table from a plugin source
//!
//! A bad unit is logged and skipped; it never stops the rest of the batch.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;

use super::builtins::HandlerCatalog;
use super::manifest::PluginManifest;
use super::registry::{insert_descriptor, CommandRegistry, CommandTable};
use crate::application::errors::PluginError;
use crate::domain::entities::CommandDescriptor;

/// One candidate plugin unit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PluginUnit {
    /// File name, used in logs and reports
    pub name: String,
    pub path: PathBuf,
}

/// Where plugin units come from and how one becomes a descriptor
pub trait PluginSource: Send + Sync {
    /// Candidate units, in load order
    fn list_units(&self) -> Result<Vec<PluginUnit>, PluginError>;

    /// Read one unit fresh and turn it into a validated descriptor
    fn load_unit(&self, unit: &PluginUnit) -> Result<CommandDescriptor, PluginError>;

    /// Whether a path would be picked up as a unit
    fn is_candidate(&self, path: &Path) -> bool;

    /// Directory to watch for changes, if the source lives on disk
    fn watch_root(&self) -> Option<&Path> {
        None
    }
}

/// Plugin units as manifest files in a single directory
pub struct ManifestDirectory {
    directory: PathBuf,
    extensions: Vec<String>,
    catalog: HandlerCatalog,
}

impl ManifestDirectory {
    pub fn new(directory: impl Into<PathBuf>, extensions: Vec<String>, catalog: HandlerCatalog) -> Self {
        Self {
            directory: directory.into(),
            extensions: extensions
                .into_iter()
                .map(|e| e.trim_start_matches('.').to_lowercase())
                .collect(),
            catalog,
        }
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }
}

impl PluginSource for ManifestDirectory {
    fn list_units(&self) -> Result<Vec<PluginUnit>, PluginError> {
        let directory_error = |source: std::io::Error| PluginError::Directory {
            path: self.directory.clone(),
            source,
        };

        let mut units = Vec::new();
        for entry in std::fs::read_dir(&self.directory).map_err(directory_error)? {
            let entry = match entry {
                Ok(e) => e,
                Err(e) => {
                    tracing::warn!("Failed to read directory entry: {}", e);
                    continue;
                }
            };

            let path = entry.path();
            if !path.is_file() || !self.is_candidate(&path) {
                continue;
            }

            let name = entry.file_name().to_string_lossy().into_owned();
            units.push(PluginUnit { name, path });
        }

        units.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(units)
    }

    fn load_unit(&self, unit: &PluginUnit) -> Result<CommandDescriptor, PluginError> {
        let manifest = PluginManifest::from_file(&unit.path)?;
        let handler = self.catalog.build(&manifest.handler)?;

        let mut descriptor = CommandDescriptor::new(manifest.command, handler).with_source(&unit.path);
        descriptor.help = manifest.help;
        descriptor.tags = manifest.tags;
        descriptor.restrict_bot_sender = manifest.is_bot;
        descriptor.restrict_to_private = manifest.private;
        Ok(descriptor)
    }

    fn is_candidate(&self, path: &Path) -> bool {
        let hidden = path
            .file_name()
            .and_then(|n| n.to_str())
            .map_or(true, |n| n.starts_with('.'));
        if hidden {
            return false;
        }
        path.extension()
            .and_then(|e| e.to_str())
            .map(|e| self.extensions.iter().any(|known| known.eq_ignore_ascii_case(e)))
            .unwrap_or(false)
    }

    fn watch_root(&self) -> Option<&Path> {
        Some(&self.directory)
    }
}

/// A unit that could not be loaded
#[derive(Debug, Clone)]
pub struct LoadFailure {
    pub unit: String,
    pub error: String,
}

/// Outcome of one load pass
#[derive(Debug, Clone, Default)]
pub struct LoadReport {
    /// Units that registered, by file name
    pub loaded: Vec<String>,
    pub failures: Vec<LoadFailure>,
    /// Alias entries in the registry after the pass
    pub aliases: usize,
}

impl LoadReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Loads plugin units into the registry
#[derive(Clone)]
pub struct PluginLoader {
    registry: Arc<CommandRegistry>,
    source: Arc<dyn PluginSource>,
    reload_lock: Arc<Mutex<()>>,
}

impl PluginLoader {
    pub fn new(registry: Arc<CommandRegistry>, source: Arc<dyn PluginSource>) -> Self {
        Self {
            registry,
            source,
            reload_lock: Arc::new(Mutex::new(())),
        }
    }

    pub fn registry(&self) -> &Arc<CommandRegistry> {
        &self.registry
    }

    pub fn source(&self) -> &Arc<dyn PluginSource> {
        &self.source
    }

    /// Load every unit and swap the result into the registry
    ///
    /// Fails only when the unit list itself cannot be read; the registry is
    /// left untouched in that case.
    pub fn load_all(&self) -> Result<LoadReport, PluginError> {
        tracing::info!("Loading commands...");
        let units = self.source.list_units()?;

        let mut table = CommandTable::new();
        let mut report = LoadReport::default();
        for unit in units {
            match self.source.load_unit(&unit) {
                Ok(descriptor) => {
                    insert_descriptor(&mut table, Arc::new(descriptor));
                    tracing::info!("Loaded plugin: {}", unit.name);
                    report.loaded.push(unit.name);
                }
                Err(e) => {
                    tracing::error!("Failed to load plugin {}: {}", unit.name, e);
                    report.failures.push(LoadFailure {
                        unit: unit.name,
                        error: e.to_string(),
                    });
                }
            }
        }

        report.aliases = self.registry.replace(table);
        tracing::info!("Total commands loaded: {}", report.aliases);
        Ok(report)
    }

    /// Reload off the async runtime, one pass at a time
    pub async fn reload(&self) -> Result<LoadReport, PluginError> {
        let _guard = self.reload_lock.lock().await;
        let loader = self.clone();
        tokio::task::spawn_blocking(move || loader.load_all())
            .await
            .map_err(|e| PluginError::Reload(e.to_string()))?
    }
}
