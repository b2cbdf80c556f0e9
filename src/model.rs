use serde::{Deserialize, Serialize};

use crate::archive::Location;
use crate::catalog::Document;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct InputFile {
    pub path: String,
    pub sha256: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct LanguageOutput {
    pub language: String,
    pub document_count: usize,
    pub included_count: usize,
    pub html_path: String,
    pub pdf_path: Option<String>,
    pub outline_path: Option<String>,
    pub outline_repeated: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct HelpOutput {
    pub version: String,
    pub sql_path: String,
    pub category_count: usize,
    pub topic_count: usize,
    pub keyword_count: usize,
    pub relation_count: usize,
    pub checked: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum RunOutputs {
    Pdf(Vec<LanguageOutput>),
    Help(Vec<HelpOutput>),
}

#[derive(Debug, Clone, Serialize)]
pub struct RunManifest {
    pub manifest_version: u32,
    pub run_id: String,
    pub command: String,
    pub command_line: Vec<String>,
    pub started_at: String,
    pub finished_at: String,
    pub config_path: Option<String>,
    pub inputs: Vec<InputFile>,
    pub outputs: RunOutputs,
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CatalogEntry {
    pub header: String,
    pub url: String,
    pub aliases: Vec<String>,
    #[serde(rename = "idPath")]
    pub id_path: String,
    pub depth: usize,
    #[serde(rename = "depthLabel")]
    pub depth_label: String,
    pub include: u32,
    pub location: Location,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub origin: Option<String>,
}

impl From<&Document> for CatalogEntry {
    fn from(document: &Document) -> Self {
        Self {
            header: document.header.clone(),
            url: document.url.to_string(),
            aliases: document.aliases.iter().map(ToString::to_string).collect(),
            id_path: document.id_path.clone(),
            depth: document.depth,
            depth_label: document.depth_label.clone(),
            include: document.include,
            location: document.location.clone(),
            origin: document.origin.as_ref().map(ToString::to_string),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct LanguageCatalog {
    pub language: String,
    pub document_count: usize,
    pub documents: Vec<CatalogEntry>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CatalogManifest {
    pub manifest_version: u32,
    pub generated_at: String,
    pub catalog_path: String,
    pub archive_manifest_path: String,
    pub languages: Vec<LanguageCatalog>,
}
