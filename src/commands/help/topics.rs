use std::collections::{HashMap, HashSet};

use anyhow::{Context, Result, bail};
use tracing::warn;

use super::categories::HelpCategories;
use super::version::{Inclusion, Version};
use crate::catalog::ManifestRow;

/// First id handed to generated topics; 1 and 2 hold the help date and version topics.
pub const FIRST_TOPIC_ID: u32 = 3;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HelpItem {
    pub url: String,
    pub category_id: u32,
    pub keywords: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Keywords {
    pub keywords: Vec<(u32, String)>,
    pub relations: Vec<(u32, u32)>,
}

/// Manifest rows that become help topics for `version`, in manifest order.
pub fn select_help_items(
    rows: &[ManifestRow],
    categories: &HelpCategories,
    version: Version,
    warnings: &mut Vec<String>,
) -> Result<Vec<HelpItem>> {
    let mut seen = HashSet::new();
    let mut items = Vec::new();

    for row in rows {
        let url = row.url.trim();
        if url.is_empty() {
            continue;
        }
        if row.help_include.trim().is_empty() {
            warn!(url, "no HELP Include value, skipping");
            warnings.push(format!("no HELP Include for {url}"));
            continue;
        }
        let inclusion = Inclusion::parse(&row.help_include)
            .with_context(|| format!("invalid HELP Include for {url}"))?;
        if !inclusion.includes(version) {
            continue;
        }
        if !seen.insert(url.to_string()) {
            warn!(url, "duplicate help url, skipping");
            warnings.push(format!("duplicate help url {url}"));
            continue;
        }

        let Some(category_id) = categories.id_of(&row.help_category) else {
            bail!(
                "unknown help category '{}' for {url} in {version}",
                row.help_category
            );
        };
        let mut keywords: Vec<String> = Vec::new();
        for keyword in row.help_keywords.split(';').map(str::trim) {
            if !keyword.is_empty() && !keywords.iter().any(|known| known == keyword) {
                keywords.push(keyword.to_string());
            }
        }

        items.push(HelpItem {
            url: url.to_string(),
            category_id,
            keywords,
        });
    }

    Ok(items)
}

/// Keyword ids in first-appearance order and the topic/keyword relations.
pub fn collect_keywords(items: &[HelpItem]) -> Keywords {
    let mut ids: HashMap<&str, u32> = HashMap::new();
    let mut collected = Keywords::default();

    for (topic_id, item) in (FIRST_TOPIC_ID..).zip(items) {
        for keyword in &item.keywords {
            let next_id = u32::try_from(ids.len() + 1).unwrap_or(u32::MAX);
            let keyword_id = *ids.entry(keyword.as_str()).or_insert_with(|| {
                collected.keywords.push((next_id, keyword.clone()));
                next_id
            });
            collected.relations.push((topic_id, keyword_id));
        }
    }

    collected
}
