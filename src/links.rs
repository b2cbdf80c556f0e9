use std::collections::HashMap;

use anyhow::{Context, Result};
use regex::{Captures, Regex};

use crate::catalog::Catalog;
use crate::url::UrlRules;

pub struct LinkInternalizer {
    href: Regex,
    internal_href: Regex,
}

impl LinkInternalizer {
    pub fn new() -> Result<Self> {
        let href = Regex::new(r#"(href ?= ?")([^"]*)""#).context("failed to compile href regex")?;
        let internal_href = Regex::new(r#"(href ?= ?")#([^"]*)""#)
            .context("failed to compile internal href regex")?;
        Ok(Self {
            href,
            internal_href,
        })
    }

    /// Point every href naming an included document (or one of its aliases) at its anchor.
    pub fn internalize(&self, text: &str, catalog: &Catalog) -> String {
        let targets = link_targets(catalog);
        let rewritten = self.href.replace_all(text, |captures: &Captures| {
            let prefix = &captures[1];
            let value = &captures[2];
            if let Some(id_path) = targets.get(value) {
                return format!("{prefix}#{id_path}\"");
            }
            if let Some((url, fragment)) = value.split_once('#')
                && let Some(id_path) = targets.get(url)
            {
                return format!("{prefix}#{id_path}{fragment}\"");
            }
            captures[0].to_string()
        });
        self.collapse_fragments(&rewritten)
    }

    /// Keep exactly one `#` in every internal href: `#doc#part` becomes `#docpart`.
    pub fn collapse_fragments(&self, text: &str) -> String {
        self.internal_href
            .replace_all(text, |captures: &Captures| {
                format!("{}#{}\"", &captures[1], captures[2].replace('#', ""))
            })
            .into_owned()
    }
}

fn link_targets(catalog: &Catalog) -> HashMap<String, &str> {
    let mut targets = HashMap::new();
    for document in catalog.documents() {
        if !document.is_included() {
            continue;
        }
        for url in document.urls() {
            for variant in [url.as_str().to_string(), format!("{url}/")] {
                targets.entry(variant).or_insert(document.id_path.as_str());
            }
        }
    }
    targets
}

/// Rewrite site-relative `href`/`src` values into absolute urls under the base url.
pub fn absolutize(text: &str, rules: &UrlRules) -> String {
    text.replace(
        &format!("=\"{}", rules.root_marker()),
        &format!("=\"{}", rules.base_url()),
    )
}
