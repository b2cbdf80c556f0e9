use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, Result, bail};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::archive::{ArchiveIndex, Location};
use crate::url::{CanonicalUrl, UrlRules};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ManifestRow {
    #[serde(rename = "Header", default)]
    pub header: String,
    #[serde(rename = "URL", default)]
    pub url: String,
    #[serde(rename = "Include", default)]
    pub include: String,
    #[serde(rename = "Depth", default)]
    pub depth: String,
    #[serde(rename = "Duplicate slugs", default)]
    pub duplicate_slugs: String,
    #[serde(rename = "HELP Cat", default)]
    pub help_category: String,
    #[serde(rename = "HELP Keywords", default)]
    pub help_keywords: String,
    #[serde(rename = "HELP Include", default)]
    pub help_include: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogRow {
    pub header: String,
    pub url: String,
    pub include: u32,
    pub depth: usize,
    pub slugs: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub header: String,
    pub url: CanonicalUrl,
    pub aliases: Vec<CanonicalUrl>,
    pub location: Location,
    pub id_path: String,
    pub depth: usize,
    pub depth_label: String,
    pub include: u32,
    pub origin: Option<CanonicalUrl>,
}

impl Document {
    pub fn urls(&self) -> impl Iterator<Item = &CanonicalUrl> {
        self.aliases.iter().chain(std::iter::once(&self.url))
    }

    pub fn is_included(&self) -> bool {
        self.include != 0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Catalog {
    documents: Vec<Document>,
}

pub fn read_manifest(path: &Path) -> Result<Vec<ManifestRow>> {
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("failed to read manifest {}", path.display()))?;
    let mut rows = Vec::new();
    for (index, record) in reader.deserialize::<ManifestRow>().enumerate() {
        let row = record.with_context(|| {
            format!("failed to parse manifest row {} in {}", index + 2, path.display())
        })?;
        rows.push(row);
    }
    Ok(rows)
}

pub fn is_excluded_flag(include: &str) -> bool {
    matches!(include.trim(), "" | "0")
}

pub fn parse_row(row: &ManifestRow) -> std::result::Result<Option<CatalogRow>, String> {
    if is_excluded_flag(&row.include) {
        return Ok(None);
    }
    let include = row.include.trim().parse::<u32>().map_err(|err| {
        format!(
            "could not convert 'Include' field '{}' to an integer for {}: {err}",
            row.include, row.url
        )
    })?;
    if include == 0 {
        return Ok(None);
    }

    let depth_raw = row.depth.trim();
    let depth = if depth_raw.is_empty() {
        0
    } else {
        depth_raw.parse::<usize>().map_err(|_| {
            format!("invalid 'Depth' field '{}' for {}", row.depth, row.url)
        })?
    };

    let slugs = row
        .duplicate_slugs
        .split(';')
        .map(str::trim)
        .filter(|slug| !slug.is_empty())
        .map(ToOwned::to_owned)
        .collect();

    Ok(Some(CatalogRow {
        header: row.header.trim().to_string(),
        url: row.url.trim().to_string(),
        include,
        depth,
        slugs,
    }))
}

/// Drop excluded rows, apply the row limit, then validate every remaining row.
pub fn validate_rows(rows: &[ManifestRow], num_rows: i64) -> Result<Vec<CatalogRow>> {
    let candidates = rows.iter().filter(|row| !is_excluded_flag(&row.include));
    let candidates: Vec<&ManifestRow> = match usize::try_from(num_rows) {
        Ok(limit) if limit > 0 => candidates.take(limit).collect(),
        _ => candidates.collect(),
    };

    let mut valid = Vec::with_capacity(candidates.len());
    let mut errors = Vec::new();
    for row in candidates {
        match parse_row(row) {
            Ok(Some(parsed)) => valid.push(parsed),
            Ok(None) => {}
            Err(message) => errors.push(message),
        }
    }

    if !errors.is_empty() {
        bail!(
            "{} invalid manifest row(s):\n  {}",
            errors.len(),
            errors.join("\n  ")
        );
    }
    Ok(valid)
}

pub fn depth_labels(depths: &[usize]) -> Vec<String> {
    let mut counters: Vec<u32> = Vec::new();
    let mut labels = Vec::with_capacity(depths.len());

    for &depth in depths {
        if depth == 0 {
            labels.push(String::new());
            continue;
        }
        if depth > counters.len() {
            counters.resize(depth, 0);
        } else {
            counters.truncate(depth);
        }
        counters[depth - 1] += 1;

        let mut label = counters
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(".");
        while let Some(rest) = label.strip_prefix("0.") {
            label = rest.to_string();
        }
        labels.push(label);
    }

    labels
}

impl Catalog {
    pub fn build(
        rows: &[CatalogRow],
        rules: &UrlRules,
        archive: &ArchiveIndex,
        language: &str,
    ) -> Result<Self> {
        let mut documents = Vec::with_capacity(rows.len());
        let mut errors = Vec::new();

        for row in rows {
            match resolve_row(row, rules, archive, language) {
                Ok(document) => documents.push(document),
                Err(err) => errors.push(format!("{err:#}")),
            }
        }

        if !errors.is_empty() {
            bail!(
                "failed to resolve {} catalog row(s):\n  {}",
                errors.len(),
                errors.join("\n  ")
            );
        }

        Self::from_documents(documents)
    }

    /// Check id uniqueness and number the documents in the given order.
    pub fn from_documents(documents: Vec<Document>) -> Result<Self> {
        let mut seen: HashMap<&str, &CanonicalUrl> = HashMap::new();
        for document in &documents {
            if let Some(previous) = seen.insert(document.id_path.as_str(), &document.url) {
                bail!(
                    "duplicate id_path '{}' for {} (already used by {previous})",
                    document.id_path,
                    document.url
                );
            }
        }

        Ok(Self {
            documents: with_depth_labels(documents),
        })
    }

    pub fn documents(&self) -> &[Document] {
        &self.documents
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}

fn resolve_row(
    row: &CatalogRow,
    rules: &UrlRules,
    archive: &ArchiveIndex,
    language: &str,
) -> Result<Document> {
    let Some(url) = rules.normalize(&row.url) else {
        bail!("url rejected by normalizer: '{}'", row.url);
    };
    let location = archive.locate(&url)?;

    let mut aliases: Vec<CanonicalUrl> = Vec::new();
    for slug in &row.slugs {
        match rules.slug_url(language, slug) {
            Some(alias) if alias != url && !aliases.contains(&alias) => aliases.push(alias),
            Some(_) => {}
            None => warn!(slug = %slug, url = %url, "duplicate slug rejected by normalizer"),
        }
    }

    Ok(Document {
        header: row.header.clone(),
        id_path: location.id_path.clone(),
        url,
        aliases,
        location,
        depth: row.depth,
        depth_label: String::new(),
        include: row.include,
        origin: None,
    })
}

fn with_depth_labels(documents: Vec<Document>) -> Vec<Document> {
    let depths: Vec<usize> = documents.iter().map(|document| document.depth).collect();
    let labels = depth_labels(&depths);

    let mut seen: HashMap<String, CanonicalUrl> = HashMap::new();
    documents
        .into_iter()
        .zip(labels)
        .map(|(document, depth_label)| {
            if !depth_label.is_empty()
                && let Some(previous) = seen.insert(depth_label.clone(), document.url.clone())
            {
                warn!(
                    label = %depth_label,
                    url = %document.url,
                    previous = %previous,
                    "duplicate depth label, check the manifest for depth gaps"
                );
            }
            debug!(label = %depth_label, url = %document.url, "numbered document");
            Document {
                depth_label,
                ..document
            }
        })
        .collect()
}
