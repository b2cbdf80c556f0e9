use std::borrow::Cow;
use std::collections::BTreeMap;

use anyhow::{Context, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

use crate::archive::{ArchiveIndex, ContentSource};
use crate::catalog::{Catalog, Document};
use crate::url::UrlRules;

const LOCALIZED_VERSIONS_LABEL: &str = "Localized Versions";

/// How a base-language document's id reacts to discovered localized variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum BaseIdentity {
    /// Base documents keep the id assigned at catalog construction.
    #[default]
    Fixed,
    /// Base documents take the id of the last variant discovered for them.
    LastVariantWins,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalizedLink {
    pub language: String,
    pub href: String,
}

pub struct LocalizedVersionsScanner {
    heading: Regex,
    list: Regex,
    next_heading: Regex,
    item: Regex,
}

impl LocalizedVersionsScanner {
    pub fn new() -> Result<Self> {
        let heading = Regex::new(&format!(
            r"(?is)<h[3-6][^>]*>\s*{}\s*</h[3-6]\s*>",
            regex::escape(LOCALIZED_VERSIONS_LABEL)
        ))
        .context("failed to compile localized versions heading regex")?;
        let list =
            Regex::new(r"(?is)<ul[^>]*>(.*?)</ul\s*>").context("failed to compile list regex")?;
        let next_heading =
            Regex::new(r"(?i)<h[1-6][\s>]").context("failed to compile heading regex")?;
        let item = Regex::new(
            r#"(?is)<li[^>]*>\s*<a\s[^>]*?href\s*=\s*"([^"]+)"[^>]*>.*?</a>\s*\[\s*([\w-]+)\s*\]"#,
        )
        .context("failed to compile localized version item regex")?;

        Ok(Self {
            heading,
            list,
            next_heading,
            item,
        })
    }

    /// Localized variants listed under the marker heading; empty when the marker is absent.
    pub fn scan(&self, html: &str) -> Vec<LocalizedLink> {
        let Some(heading) = self.heading.find(html) else {
            return Vec::new();
        };
        let rest = &html[heading.end()..];
        let Some(list) = self.list.captures(rest) else {
            return Vec::new();
        };
        let Some(whole) = list.get(0) else {
            return Vec::new();
        };
        if self.next_heading.is_match(&rest[..whole.start()]) {
            return Vec::new();
        }

        let body = list.get(1).map(|value| value.as_str()).unwrap_or_default();
        self.item
            .captures_iter(body)
            .map(|captures| LocalizedLink {
                href: captures[1].trim().to_string(),
                language: captures[2].to_string(),
            })
            .collect()
    }
}

#[derive(Debug)]
pub struct LocalizedCatalogs<'a> {
    catalogs: BTreeMap<String, Cow<'a, Catalog>>,
}

impl<'a> LocalizedCatalogs<'a> {
    pub fn get(&self, language: &str) -> Option<&Catalog> {
        self.catalogs.get(language).map(|catalog| catalog.as_ref())
    }

    pub fn is_borrowed(&self, language: &str) -> bool {
        matches!(self.catalogs.get(language), Some(Cow::Borrowed(_)))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Catalog)> {
        self.catalogs
            .iter()
            .map(|(language, catalog)| (language.as_str(), catalog.as_ref()))
    }

    pub fn len(&self) -> usize {
        self.catalogs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.catalogs.is_empty()
    }
}

pub struct LanguageResolver<'a> {
    rules: &'a UrlRules,
    archive: &'a ArchiveIndex,
    source: &'a dyn ContentSource,
    base_language: &'a str,
    base_identity: BaseIdentity,
    scanner: LocalizedVersionsScanner,
}

impl<'a> LanguageResolver<'a> {
    pub fn new(
        rules: &'a UrlRules,
        archive: &'a ArchiveIndex,
        source: &'a dyn ContentSource,
        base_language: &'a str,
        base_identity: BaseIdentity,
    ) -> Result<Self> {
        Ok(Self {
            rules,
            archive,
            source,
            base_language,
            base_identity,
            scanner: LocalizedVersionsScanner::new()?,
        })
    }

    pub fn resolve<'c>(
        &self,
        base: &'c Catalog,
        languages: &[String],
    ) -> Result<LocalizedCatalogs<'c>> {
        let mut catalogs = BTreeMap::new();
        let wants_base = languages.iter().any(|language| language == self.base_language);

        let mut found: BTreeMap<&str, Vec<Document>> = languages
            .iter()
            .filter(|language| language.as_str() != self.base_language)
            .map(|language| (language.as_str(), Vec::new()))
            .collect();

        if found.is_empty() {
            if wants_base {
                catalogs.insert(self.base_language.to_string(), Cow::Borrowed(base));
            }
            return Ok(LocalizedCatalogs { catalogs });
        }
        let mut base_documents = base.documents().to_vec();

        for (index, document) in base.documents().iter().enumerate() {
            let content = self.source.read_content(&document.url, &document.location)?;
            for link in self.scanner.scan(&content) {
                let Some(bucket) = found.get_mut(link.language.as_str()) else {
                    continue;
                };
                let Some(url) = self.rules.normalize(&link.href) else {
                    error!(
                        source = %document.url,
                        href = %link.href,
                        "localized version link rejected by normalizer"
                    );
                    continue;
                };
                if self.rules.language_of(&url) != Some(link.language.as_str()) {
                    error!(
                        source = %document.url,
                        url = %url,
                        language = %link.language,
                        "localized version link does not match its language"
                    );
                    continue;
                }

                let location = self
                    .archive
                    .locate(&url)
                    .with_context(|| format!("localized version of {}", document.url))?;
                let derived = Document {
                    header: document.header.clone(),
                    url,
                    aliases: document.aliases.clone(),
                    id_path: location.id_path.clone(),
                    location,
                    depth: document.depth,
                    depth_label: String::new(),
                    include: document.include,
                    origin: Some(document.url.clone()),
                };

                if self.base_identity == BaseIdentity::LastVariantWins {
                    base_documents[index].id_path = derived.id_path.clone();
                }
                if !bucket.contains(&derived) {
                    debug!(
                        language = %link.language,
                        url = %derived.url,
                        "found localized version"
                    );
                    bucket.push(derived);
                }
            }
        }

        if wants_base {
            let catalog = match self.base_identity {
                BaseIdentity::Fixed => Cow::Borrowed(base),
                BaseIdentity::LastVariantWins => {
                    Cow::Owned(Catalog::from_documents(base_documents)?)
                }
            };
            catalogs.insert(self.base_language.to_string(), catalog);
        }

        for (language, documents) in found {
            let catalog = Catalog::from_documents(documents)
                .with_context(|| format!("failed to build '{language}' catalog"))?;
            info!(language, documents = catalog.len(), "resolved localized catalog");
            catalogs.insert(language.to_string(), Cow::Owned(catalog));
        }

        Ok(LocalizedCatalogs { catalogs })
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::collections::HashMap;
    use std::path::Path;

    use anyhow::anyhow;

    use super::*;
    use crate::archive::Location;
    use crate::catalog::{ManifestRow, validate_rows};
    use crate::config::UrlSection;
    use crate::url::CanonicalUrl;

    struct FakeSource {
        pages: HashMap<String, String>,
        reads: Cell<usize>,
    }

    impl FakeSource {
        fn new(pages: &[(&str, &str)]) -> Self {
            Self {
                pages: pages
                    .iter()
                    .map(|(url, html)| (url.to_string(), html.to_string()))
                    .collect(),
                reads: Cell::new(0),
            }
        }
    }

    impl ContentSource for FakeSource {
        fn read_content(&self, url: &CanonicalUrl, _location: &Location) -> Result<String> {
            self.reads.set(self.reads.get() + 1);
            self.pages
                .get(url.as_str())
                .cloned()
                .ok_or_else(|| anyhow!("no content for {url}"))
        }
    }

    fn rules() -> UrlRules {
        UrlRules::from_config(&UrlSection::default()).expect("rules")
    }

    fn archive() -> ArchiveIndex {
        ArchiveIndex::parse(
            "https://mariadb.com/kb/en/select html/en/select.html\n\
             https://mariadb.com/kb/en/joins html/en/joins.html\n\
             https://mariadb.com/kb/en/insert html/en/insert.html\n\
             https://mariadb.com/kb/it/select html/it/select.html\n\
             https://mariadb.com/kb/it/join html/it/join.html\n\
             https://mariadb.com/kb/it/insert html/it/insert.html\n\
             https://mariadb.com/kb/fr/select html/fr/select.html\n",
            Path::new("archive"),
        )
        .expect("archive")
    }

    fn base_catalog(rules: &UrlRules, archive: &ArchiveIndex) -> Catalog {
        let rows: Vec<ManifestRow> = [
            ("Select", "select", "1"),
            ("Joins", "joins", "2"),
            ("Insert", "insert", "1"),
        ]
        .iter()
        .map(|(header, slug, depth)| ManifestRow {
            header: header.to_string(),
            url: format!("https://mariadb.com/kb/en/{slug}/"),
            include: "1".to_string(),
            depth: depth.to_string(),
            ..ManifestRow::default()
        })
        .collect();
        let valid = validate_rows(&rows, 0).expect("rows");
        Catalog::build(&valid, rules, archive, "en").expect("catalog")
    }

    fn localized(links: &[(&str, &str)]) -> String {
        let items: String = links
            .iter()
            .map(|(href, lang)| format!("<li><a href=\"{href}\">Title</a> [{lang}]</li>\n"))
            .collect();
        format!(
            "<div><h3>Localized Versions</h3></div>\n<div>\n<ul>\n{items}</ul>\n</div><h2>Comments</h2>"
        )
    }

    fn source() -> FakeSource {
        FakeSource::new(&[
            (
                "https://mariadb.com/kb/en/select",
                &localized(&[("/kb/it/select/", "it"), ("/kb/fr/select/", "fr")]),
            ),
            (
                "https://mariadb.com/kb/en/joins",
                &localized(&[("/kb/it/join/", "it"), ("/kb/de/join/", "it")]),
            ),
            ("https://mariadb.com/kb/en/insert", "<h1>INSERT</h1>"),
        ])
    }

    #[test]
    fn base_only_request_skips_content_scan() {
        let rules = rules();
        let archive = archive();
        let base = base_catalog(&rules, &archive);
        let source = source();
        let resolver =
            LanguageResolver::new(&rules, &archive, &source, "en", BaseIdentity::Fixed)
                .expect("resolver");

        let catalogs = resolver.resolve(&base, &["en".to_string()]).expect("resolve");
        assert_eq!(source.reads.get(), 0);
        assert_eq!(catalogs.len(), 1);
        assert!(catalogs.is_borrowed("en"));
        assert!(std::ptr::eq(catalogs.get("en").expect("en"), &base));
    }

    #[test]
    fn discovers_variants_and_renumbers_per_language() {
        let rules = rules();
        let archive = archive();
        let base = base_catalog(&rules, &archive);
        let source = source();
        let resolver =
            LanguageResolver::new(&rules, &archive, &source, "en", BaseIdentity::Fixed)
                .expect("resolver");

        let catalogs = resolver
            .resolve(&base, &["en".to_string(), "it".to_string()])
            .expect("resolve");
        assert_eq!(source.reads.get(), 3);
        assert!(catalogs.is_borrowed("en"));

        let italian = catalogs.get("it").expect("it");
        let urls: Vec<&str> = italian
            .documents()
            .iter()
            .map(|document| document.url.as_str())
            .collect();
        assert_eq!(
            urls,
            vec![
                "https://mariadb.com/kb/it/select",
                "https://mariadb.com/kb/it/join"
            ]
        );
        let labels: Vec<&str> = italian
            .documents()
            .iter()
            .map(|document| document.depth_label.as_str())
            .collect();
        assert_eq!(labels, vec!["1", "1.1"]);
        assert_eq!(italian.documents()[1].header, "Joins");
        assert_eq!(
            italian.documents()[1].origin.as_ref().map(CanonicalUrl::as_str),
            Some("https://mariadb.com/kb/en/joins")
        );
        assert_eq!(italian.documents()[0].id_path, "html/it/select.html");

        let english = catalogs.get("en").expect("en");
        assert_eq!(english.documents()[0].id_path, "html/en/select.html");
    }

    #[test]
    fn last_variant_wins_overwrites_base_identity() {
        let rules = rules();
        let archive = archive();
        let base = base_catalog(&rules, &archive);
        let source = source();
        let resolver = LanguageResolver::new(
            &rules,
            &archive,
            &source,
            "en",
            BaseIdentity::LastVariantWins,
        )
        .expect("resolver");

        let catalogs = resolver
            .resolve(&base, &["en".to_string(), "it".to_string(), "fr".to_string()])
            .expect("resolve");
        assert!(!catalogs.is_borrowed("en"));
        let english = catalogs.get("en").expect("en");
        assert_eq!(english.documents()[0].id_path, "html/fr/select.html");
        assert_eq!(english.documents()[1].id_path, "html/it/join.html");
        assert_eq!(english.documents()[2].id_path, "html/en/insert.html");
        assert_eq!(catalogs.get("fr").expect("fr").len(), 1);
    }

    #[test]
    fn unrequested_base_language_is_left_out() {
        let rules = rules();
        let archive = archive();
        let base = base_catalog(&rules, &archive);
        let source = source();
        let resolver =
            LanguageResolver::new(&rules, &archive, &source, "en", BaseIdentity::Fixed)
                .expect("resolver");

        let catalogs = resolver.resolve(&base, &["fr".to_string()]).expect("resolve");
        assert!(catalogs.get("en").is_none());
        let names: Vec<&str> = catalogs.iter().map(|(language, _)| language).collect();
        assert_eq!(names, vec!["fr"]);
    }

    #[test]
    fn missing_localized_archive_entry_is_fatal() {
        let rules = rules();
        let archive = archive();
        let base = base_catalog(&rules, &archive);
        let source = FakeSource::new(&[
            (
                "https://mariadb.com/kb/en/select",
                &localized(&[("/kb/es/select/", "es")]),
            ),
            ("https://mariadb.com/kb/en/joins", ""),
            ("https://mariadb.com/kb/en/insert", ""),
        ]);
        let resolver =
            LanguageResolver::new(&rules, &archive, &source, "en", BaseIdentity::Fixed)
                .expect("resolver");

        let error = resolver
            .resolve(&base, &["es".to_string()])
            .expect_err("must fail");
        assert!(
            format!("{error:#}")
                .contains("url not found in archive: https://mariadb.com/kb/es/select")
        );
    }

    #[test]
    fn scanner_requires_marker_heading_before_list() {
        let scanner = LocalizedVersionsScanner::new().expect("scanner");
        assert!(scanner.scan("<ul><li><a href=\"/kb/it/x/\">x</a> [it]</li></ul>").is_empty());
        assert!(
            scanner
                .scan("<h4>Localized Versions</h4><h2>Other</h2><ul><li><a href=\"/kb/it/x/\">x</a> [it]</li></ul>")
                .is_empty()
        );

        let links = scanner.scan(&localized(&[("/kb/pt-br/select/", "pt-br")]));
        assert_eq!(
            links,
            vec![LocalizedLink {
                language: "pt-br".to_string(),
                href: "/kb/pt-br/select/".to_string(),
            }]
        );
    }
}
