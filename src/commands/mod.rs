pub mod catalog;
pub mod help;
pub mod normalize;
pub mod pdf;

#[cfg(test)]
pub mod test_support;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::info;

use crate::archive::{ArchiveIndex, ContentSource};
use crate::catalog::{Catalog, read_manifest, validate_rows};
use crate::config::{KbConfig, load_config, resolve_config_path};
use crate::languages::LanguageResolver;
use crate::url::UrlRules;

pub struct Workspace {
    pub config: KbConfig,
    pub config_path: Option<PathBuf>,
    pub rules: UrlRules,
}

impl Workspace {
    pub fn load(config: Option<&Path>) -> Result<Self> {
        let (path, explicit) = resolve_config_path(config);
        let loaded = load_config(&path, explicit)?;
        let config_path = path.exists().then_some(path);
        match &config_path {
            Some(path) => info!(config = %path.display(), "loaded configuration"),
            None => info!("no configuration file found, using defaults"),
        }
        let mut workspace = Self::from_config(loaded)?;
        workspace.config_path = config_path;
        Ok(workspace)
    }

    pub fn from_config(config: KbConfig) -> Result<Self> {
        let rules = UrlRules::from_config(&config.urls).context("invalid [urls] configuration")?;
        Ok(Self {
            config,
            config_path: None,
            rules,
        })
    }

    pub fn load_archive(&self) -> Result<ArchiveIndex> {
        let manifest = &self.config.paths.archive_manifest;
        let archive = ArchiveIndex::load(manifest, &self.config.paths.archive_root())?;
        info!(
            manifest = %manifest.display(),
            entries = archive.len(),
            "loaded archive manifest"
        );
        Ok(archive)
    }

    /// Read, validate and resolve the url manifest in the base language.
    pub fn base_catalog(&self, archive: &ArchiveIndex, num_rows: i64) -> Result<Catalog> {
        let path = &self.config.paths.catalog;
        let rows = read_manifest(path)?;
        let valid = validate_rows(&rows, num_rows)
            .with_context(|| format!("invalid url manifest {}", path.display()))?;
        let catalog = Catalog::build(
            &valid,
            &self.rules,
            archive,
            &self.config.urls.base_language,
        )?;
        info!(
            rows = rows.len(),
            documents = catalog.len(),
            "resolved base catalog"
        );
        Ok(catalog)
    }

    pub fn resolver<'a>(
        &'a self,
        archive: &'a ArchiveIndex,
        source: &'a dyn ContentSource,
    ) -> Result<LanguageResolver<'a>> {
        LanguageResolver::new(
            &self.rules,
            archive,
            source,
            &self.config.urls.base_language,
            self.config.urls.base_identity,
        )
    }

    pub fn languages_or_default(&self, requested: &[String]) -> Vec<String> {
        if requested.is_empty() {
            self.config.langs.clone()
        } else {
            requested.to_vec()
        }
    }
}

pub fn command_line() -> Vec<String> {
    std::env::args().collect()
}
