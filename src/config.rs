use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use toml::Value;

use crate::languages::BaseIdentity;

pub const DEFAULT_CONFIG_PATH: &str = "kbdocs.toml";
pub const DEFAULT_BASE_URL: &str = "https://mariadb.com/kb/";

const DEFAULT_IGNORED_SUFFIXES: &[&str] = &[
    "+translate",
    "+flag",
    "+history",
    "/ask",
    "+search",
    "+change_order",
    "/post",
    "/remove",
    "/add",
    "+source",
];

const DEFAULT_IGNORED_SEGMENTS: &[&str] = &[
    "/+search/",
    "/+change_order/",
    "/+history/",
    "/+translate/",
    "/+flag/",
    "/+r/",
    "/ask/",
    "/post/",
    "/remove/",
    "/add/",
];

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct KbConfig {
    pub full_run: bool,
    pub langs: Vec<String>,
    pub paths: PathsSection,
    pub urls: UrlSection,
    pub creation: CreationSection,
    pub filenames: FilenamesSection,
    pub toc: TocSection,
    pub renderer: RendererSection,
}

impl Default for KbConfig {
    fn default() -> Self {
        Self {
            full_run: false,
            langs: vec!["en".to_string()],
            paths: PathsSection::default(),
            urls: UrlSection::default(),
            creation: CreationSection::default(),
            filenames: FilenamesSection::default(),
            toc: TocSection::default(),
            renderer: RendererSection::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct PathsSection {
    pub catalog: PathBuf,
    pub archive_manifest: PathBuf,
    pub archive_root: Option<PathBuf>,
    pub categories: PathBuf,
    pub help_preamble: Option<PathBuf>,
    pub output_dir: PathBuf,
}

impl Default for PathsSection {
    fn default() -> Self {
        Self {
            catalog: PathBuf::from("kb_urls.csv"),
            archive_manifest: PathBuf::from("url_locations.txt"),
            archive_root: None,
            categories: PathBuf::from("help_cats.csv"),
            help_preamble: None,
            output_dir: PathBuf::from("output"),
        }
    }
}

impl PathsSection {
    /// Root stripped from archive locations to form ids; the manifest's directory unless set.
    pub fn archive_root(&self) -> PathBuf {
        self.archive_root.clone().unwrap_or_else(|| {
            self.archive_manifest
                .parent()
                .map(Path::to_path_buf)
                .unwrap_or_default()
        })
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct UrlSection {
    pub base_url: String,
    pub base_language: String,
    pub ignored_suffixes: Vec<String>,
    pub ignored_segments: Vec<String>,
    pub base_identity: BaseIdentity,
}

impl Default for UrlSection {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            base_language: "en".to_string(),
            ignored_suffixes: DEFAULT_IGNORED_SUFFIXES
                .iter()
                .map(ToString::to_string)
                .collect(),
            ignored_segments: DEFAULT_IGNORED_SEGMENTS
                .iter()
                .map(ToString::to_string)
                .collect(),
            base_identity: BaseIdentity::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(default)]
pub struct CreationSection {
    pub pdf: bool,
    pub repeat_outline: bool,
    pub num_rows: i64,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct FilenamesSection {
    pub pdf: String,
    pub html: String,
}

impl Default for FilenamesSection {
    fn default() -> Self {
        Self {
            pdf: "mariadb-server-documentation-{lang}.pdf".to_string(),
            html: "mariadb-server-documentation-{lang}.html".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct TocSection {
    pub main_font_size: String,
    pub main_indent: String,
    pub main_margin: String,
    pub chapter_font_size: String,
    pub chapter_indent: String,
    pub chapter_margin: String,
}

impl Default for TocSection {
    fn default() -> Self {
        Self {
            main_font_size: "12px".to_string(),
            main_indent: "20px".to_string(),
            main_margin: "2px".to_string(),
            chapter_font_size: "16px".to_string(),
            chapter_indent: "0px".to_string(),
            chapter_margin: "12px".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct RendererSection {
    pub binary: String,
    pub options: BTreeMap<String, Value>,
}

impl Default for RendererSection {
    fn default() -> Self {
        Self {
            binary: "wkhtmltopdf".to_string(),
            options: BTreeMap::new(),
        }
    }
}

impl RendererSection {
    pub fn option_args(&self) -> Result<Vec<String>> {
        let mut args = Vec::new();
        for (key, value) in &self.options {
            let flag = format!("--{}", key.trim_start_matches('-'));
            match value {
                Value::Boolean(true) => args.push(flag),
                Value::Boolean(false) => {}
                Value::String(text) => {
                    args.push(flag);
                    args.push(text.clone());
                }
                Value::Integer(number) => {
                    args.push(flag);
                    args.push(number.to_string());
                }
                Value::Float(number) => {
                    args.push(flag);
                    args.push(number.to_string());
                }
                other => bail!("unsupported renderer option type for '{key}': {other}"),
            }
        }
        Ok(args)
    }
}

/// Load the TOML config. A missing file yields defaults unless the path was given explicitly.
pub fn load_config(config_path: &Path, explicit: bool) -> Result<KbConfig> {
    if !config_path.exists() {
        if explicit {
            bail!("config file not found: {}", config_path.display());
        }
        return Ok(KbConfig::default());
    }
    let content = fs::read_to_string(config_path)
        .with_context(|| format!("failed to read {}", config_path.display()))?;
    let parsed: KbConfig = toml::from_str(&content)
        .with_context(|| format!("failed to parse {}", config_path.display()))?;
    Ok(parsed)
}

pub fn resolve_config_path(config: Option<&Path>) -> (PathBuf, bool) {
    match config {
        Some(path) => (path.to_path_buf(), true),
        None => (PathBuf::from(DEFAULT_CONFIG_PATH), false),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn default_config_targets_english_only() {
        let config = KbConfig::default();
        assert_eq!(config.langs, vec!["en".to_string()]);
        assert_eq!(config.urls.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.urls.base_identity, BaseIdentity::Fixed);
        assert!(!config.creation.pdf);
    }

    #[test]
    fn missing_default_config_falls_back_to_defaults() {
        let config =
            load_config(Path::new("/nonexistent/kbdocs.toml"), false).expect("load config");
        assert_eq!(config, KbConfig::default());
    }

    #[test]
    fn missing_explicit_config_is_an_error() {
        let error =
            load_config(Path::new("/nonexistent/kbdocs.toml"), true).expect_err("must fail");
        assert!(error.to_string().contains("config file not found"));
    }

    #[test]
    fn load_config_parses_sections() {
        let temp = tempdir().expect("tempdir");
        let config_path = temp.path().join("kbdocs.toml");
        fs::write(
            &config_path,
            r#"
full_run = true
langs = ["en", "it"]

[paths]
catalog = "input/kb_urls.csv"
archive_manifest = "archive/url_locations.txt"

[urls]
base_identity = "last-variant-wins"

[creation]
num_rows = 25

[filenames]
pdf = "docs-{lang}.pdf"

[renderer]
binary = "/usr/local/bin/wkhtmltopdf"

[renderer.options]
margin-top = "20mm"
outline = true
disable-smart-shrinking = false
"#,
        )
        .expect("write config");

        let config = load_config(&config_path, true).expect("load config");
        assert!(config.full_run);
        assert_eq!(config.langs, vec!["en".to_string(), "it".to_string()]);
        assert_eq!(config.paths.catalog, PathBuf::from("input/kb_urls.csv"));
        assert_eq!(config.paths.archive_root(), PathBuf::from("archive"));
        assert_eq!(config.urls.base_identity, BaseIdentity::LastVariantWins);
        assert_eq!(config.urls.base_language, "en");
        assert_eq!(config.creation.num_rows, 25);
        assert_eq!(config.filenames.pdf, "docs-{lang}.pdf");
        assert_eq!(
            config.renderer.option_args().expect("args"),
            vec![
                "--margin-top".to_string(),
                "20mm".to_string(),
                "--outline".to_string()
            ]
        );
    }

    #[test]
    fn load_config_reports_invalid_toml() {
        let temp = tempdir().expect("tempdir");
        let config_path = temp.path().join("kbdocs.toml");
        fs::write(&config_path, "[paths\ncatalog = 1").expect("write config");
        let error = load_config(&config_path, true).expect_err("must fail");
        assert!(error.to_string().contains("failed to parse"));
    }

    #[test]
    fn renderer_rejects_nested_option_values() {
        let mut renderer = RendererSection::default();
        renderer
            .options
            .insert("header".to_string(), Value::Array(Vec::new()));
        assert!(renderer.option_args().is_err());
    }
}
