use std::fmt;

use anyhow::{Result, bail};

use crate::config::UrlSection;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CanonicalUrl(String);

impl CanonicalUrl {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CanonicalUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone)]
pub struct UrlRules {
    base_url: String,
    host: String,
    base_path: String,
    ignored_suffixes: Vec<String>,
    ignored_segments: Vec<String>,
}

impl UrlRules {
    pub fn new(
        base_url: &str,
        ignored_suffixes: Vec<String>,
        ignored_segments: Vec<String>,
    ) -> Result<Self> {
        let trimmed = base_url.trim();
        let Some((scheme, rest)) = trimmed
            .split_once("://")
            .filter(|(scheme, _)| matches!(*scheme, "http" | "https"))
        else {
            bail!("base url must be an absolute http(s) url: {base_url}");
        };
        let (host, path) = rest.split_once('/').unwrap_or((rest, ""));
        if host.is_empty() {
            bail!("base url has no host: {base_url}");
        }
        let base_path = path.trim_matches('/').to_string();
        let base_url = if base_path.is_empty() {
            format!("{scheme}://{host}/")
        } else {
            format!("{scheme}://{host}/{base_path}/")
        };

        Ok(Self {
            base_url,
            host: host.to_string(),
            base_path,
            ignored_suffixes,
            ignored_segments,
        })
    }

    pub fn from_config(section: &UrlSection) -> Result<Self> {
        Self::new(
            &section.base_url,
            section.ignored_suffixes.clone(),
            section.ignored_segments.clone(),
        )
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Site-relative prefix of links that belong under the base url, e.g. `/kb/`.
    pub fn root_marker(&self) -> String {
        if self.base_path.is_empty() {
            "/".to_string()
        } else {
            format!("/{}/", self.base_path)
        }
    }

    pub fn normalize(&self, raw: &str) -> Option<CanonicalUrl> {
        let path = self.relative_path(raw)?;
        if path.is_empty() || path == self.base_path {
            return None;
        }

        if self
            .ignored_suffixes
            .iter()
            .any(|suffix| path.ends_with(suffix.as_str()))
        {
            return None;
        }

        let wrapped = format!("/{path}/");
        if self
            .ignored_segments
            .iter()
            .any(|segment| wrapped.contains(segment.as_str()))
        {
            return None;
        }

        Some(CanonicalUrl(format!("{}{}", self.base_url, path)))
    }

    /// Path of a canonical url below the base url, e.g. `en/select`.
    pub fn path_of<'a>(&self, url: &'a CanonicalUrl) -> &'a str {
        url.as_str()
            .strip_prefix(self.base_url.as_str())
            .unwrap_or(url.as_str())
    }

    pub fn language_of<'a>(&self, url: &'a CanonicalUrl) -> Option<&'a str> {
        self.path_of(url)
            .split('/')
            .next()
            .filter(|lang| !lang.is_empty())
    }

    pub fn slug_url(&self, language: &str, slug: &str) -> Option<CanonicalUrl> {
        let slug = slug.trim().trim_matches('/');
        if slug.is_empty() {
            return None;
        }
        self.normalize(&format!("{}{}/{}/", self.base_url, language, slug))
    }

    fn relative_path<'a>(&self, raw: &'a str) -> Option<&'a str> {
        let end = raw.find(['?', '#']).unwrap_or(raw.len());
        let mut rest = raw[..end].trim();

        let had_scheme = if let Some(stripped) = strip_scheme(rest) {
            rest = stripped;
            true
        } else {
            false
        };

        if let Some(stripped) = rest.strip_prefix(self.host.as_str()) {
            if !(stripped.is_empty() || stripped.starts_with('/')) {
                return None;
            }
            rest = stripped;
        } else if had_scheme {
            return None;
        }

        rest = rest.strip_prefix('/').unwrap_or(rest);
        if !self.base_path.is_empty()
            && let Some(stripped) = rest
                .strip_prefix(self.base_path.as_str())
                .and_then(|value| value.strip_prefix('/'))
        {
            rest = stripped;
        }

        Some(rest.trim_matches(|c: char| c == '/' || c.is_whitespace()))
    }
}

fn strip_scheme(value: &str) -> Option<&str> {
    value
        .strip_prefix("https://")
        .or_else(|| value.strip_prefix("http://"))
}
