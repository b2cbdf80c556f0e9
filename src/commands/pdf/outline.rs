use std::fs;
use std::path::Path;

use anyhow::{Context, Result, bail};
use regex::Regex;

use crate::catalog::Catalog;
use crate::merge::{TocItem, display_title};
use crate::util::unescape_html;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutlineEntry {
    pub title: String,
    pub page: u32,
}

/// Numbered entries (title starting with a digit) of a renderer outline dump.
pub fn parse_outline(text: &str) -> Result<Vec<OutlineEntry>> {
    let item = Regex::new(r#"^<item\s+title="([^"]*)"\s+page="([^"]*)""#)
        .context("failed to compile outline item regex")?;

    let mut entries = Vec::new();
    for (index, line) in text.lines().enumerate() {
        let Some(captures) = item.captures(line.trim()) else {
            continue;
        };
        let title = unescape_html(&captures[1]);
        if !title.starts_with(|ch: char| ch.is_ascii_digit()) {
            continue;
        }
        let page = captures[2].trim().parse::<u32>().with_context(|| {
            format!("line {}: invalid page '{}' for '{title}'", index + 1, &captures[2])
        })?;
        entries.push(OutlineEntry { title, page });
    }
    Ok(entries)
}

pub fn read_outline(path: &Path) -> Result<Vec<OutlineEntry>> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read outline dump {}", path.display()))?;
    parse_outline(&text).with_context(|| format!("invalid outline dump {}", path.display()))
}

/// Pair outline entries with the numbered documents; unnumbered documents keep page 0.
pub fn outline_with_pages(catalog: &Catalog, entries: &[OutlineEntry]) -> Result<Vec<TocItem>> {
    let numbered = catalog
        .documents()
        .iter()
        .filter(|document| !document.depth_label.is_empty())
        .count();
    if numbered != entries.len() {
        bail!(
            "outline has {} numbered entries but the catalog has {numbered} numbered documents",
            entries.len()
        );
    }

    let mut pages = entries.iter();
    Ok(catalog
        .documents()
        .iter()
        .map(|document| {
            let entry = if document.depth_label.is_empty() {
                None
            } else {
                pages.next()
            };
            TocItem {
                header: entry.map_or_else(|| display_title(document), |entry| entry.title.clone()),
                page_num: entry.map_or(0, |entry| entry.page),
                link_id: document.id_path.clone(),
                depth: document.depth,
            }
        })
        .collect())
}
