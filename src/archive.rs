use std::collections::HashMap;
use std::fs;
use std::path::{Component, Path, PathBuf};

use anyhow::{Context, Result, bail};
use serde::Serialize;

use crate::url::CanonicalUrl;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Location {
    pub path: PathBuf,
    pub id_path: String,
}

pub trait ContentSource {
    fn read_content(&self, url: &CanonicalUrl, location: &Location) -> Result<String>;
}

#[derive(Debug, Clone)]
pub struct ArchiveIndex {
    root: PathBuf,
    entries: HashMap<String, PathBuf>,
}

impl ArchiveIndex {
    pub fn load(manifest_path: &Path, root: &Path) -> Result<Self> {
        let text = fs::read_to_string(manifest_path).with_context(|| {
            format!("failed to read archive manifest {}", manifest_path.display())
        })?;
        Self::parse(&text, root)
            .with_context(|| format!("invalid archive manifest {}", manifest_path.display()))
    }

    pub fn parse(text: &str, root: &Path) -> Result<Self> {
        let mut entries = HashMap::new();
        for (index, line) in text.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let Some((url, location)) = line.split_once(char::is_whitespace) else {
                bail!("line {}: expected '<url> <location>', got '{line}'", index + 1);
            };
            let location = location.trim();
            if location.is_empty() {
                bail!("line {}: missing location for {url}", index + 1);
            }
            entries.insert(
                lookup_key(url).to_string(),
                PathBuf::from(location.replace('\\', "/")),
            );
        }

        Ok(Self {
            root: root.to_path_buf(),
            entries,
        })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn locate(&self, url: &CanonicalUrl) -> Result<Location> {
        let Some(raw) = self.entries.get(lookup_key(url.as_str())) else {
            bail!("url not found in archive: {url}");
        };
        let path = if raw.is_absolute() {
            raw.clone()
        } else {
            self.root.join(raw)
        };
        let Ok(relative) = path.strip_prefix(&self.root) else {
            bail!(
                "archive location for {url} is outside the archive root: {}",
                raw.display()
            );
        };
        let mut parts = Vec::new();
        for component in relative.components() {
            match component {
                Component::Normal(part) => parts.push(part.to_string_lossy().into_owned()),
                Component::CurDir => {}
                _ => bail!(
                    "archive location for {url} is outside the archive root: {}",
                    raw.display()
                ),
            }
        }
        let id_path = parts.join("/");
        if id_path.is_empty() {
            bail!("archive location for {url} has no usable path: {}", raw.display());
        }

        Ok(Location { path, id_path })
    }
}

impl ContentSource for ArchiveIndex {
    fn read_content(&self, url: &CanonicalUrl, location: &Location) -> Result<String> {
        fs::read_to_string(&location.path).with_context(|| {
            format!(
                "failed to read archived content for {url} ({})",
                location.path.display()
            )
        })
    }
}

fn lookup_key(url: &str) -> &str {
    let url = url.trim();
    url.strip_suffix('/').unwrap_or(url)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::UrlSection;
    use crate::url::UrlRules;
    use tempfile::tempdir;

    fn canonical(raw: &str) -> CanonicalUrl {
        UrlRules::from_config(&UrlSection::default())
            .expect("rules")
            .normalize(raw)
            .expect("canonical url")
    }

    #[test]
    fn locate_strips_one_trailing_slash_and_derives_id_path() {
        let manifest = "https://mariadb.com/kb/en/select/ ./html/en/select.html\n\
                        https://mariadb.com/kb/en/insert html\\en\\insert.html\n\n";
        let index = ArchiveIndex::parse(manifest, Path::new("archive")).expect("parse");
        assert_eq!(index.len(), 2);

        let select = index.locate(&canonical("/kb/en/select/")).expect("select");
        assert_eq!(select.id_path, "html/en/select.html");
        assert_eq!(select.path, Path::new("archive/./html/en/select.html"));

        let insert = index.locate(&canonical("/kb/en/insert")).expect("insert");
        assert_eq!(insert.id_path, "html/en/insert.html");
        assert_eq!(insert.path, Path::new("archive/html/en/insert.html"));
    }

    #[test]
    fn locations_outside_the_root_are_rejected() {
        let manifest = "https://mariadb.com/kb/en/select ../html/en/select.html\n\
                        https://mariadb.com/kb/en/insert /srv/other/insert.html\n\
                        https://mariadb.com/kb/en/update html/en/update.html\n";
        let index = ArchiveIndex::parse(manifest, Path::new("archive")).expect("parse");

        for raw in ["/kb/en/select/", "/kb/en/insert/"] {
            let url = canonical(raw);
            let error = index.locate(&url).expect_err("escapes root");
            let message = error.to_string();
            assert!(message.contains("outside the archive root"), "{message}");
            assert!(message.contains(url.as_str()), "{message}");
        }
        let update = index.locate(&canonical("/kb/en/update/")).expect("update");
        assert_eq!(update.id_path, "html/en/update.html");
    }

    #[test]
    fn missing_url_reports_the_url() {
        let index = ArchiveIndex::parse("", Path::new("archive")).expect("parse");
        assert!(index.is_empty());
        let error = index
            .locate(&canonical("/kb/en/update/"))
            .expect_err("must fail");
        assert!(
            error
                .to_string()
                .contains("url not found in archive: https://mariadb.com/kb/en/update")
        );
    }

    #[test]
    fn malformed_line_is_a_load_error() {
        let error = ArchiveIndex::parse(
            "https://mariadb.com/kb/en/a a.html\nhttps://mariadb.com/kb/en/b\n",
            Path::new("."),
        )
        .expect_err("must fail");
        assert!(error.to_string().contains("line 2"));
    }

    #[test]
    fn read_failure_names_the_logical_url() {
        let temp = tempdir().expect("tempdir");
        let manifest_path = temp.path().join("url_locations.txt");
        fs::write(
            &manifest_path,
            "https://mariadb.com/kb/en/select html/en/select.html\n\
             https://mariadb.com/kb/en/gone html/en/gone.html\n",
        )
        .expect("write manifest");
        fs::create_dir_all(temp.path().join("html/en")).expect("mkdir");
        fs::write(temp.path().join("html/en/select.html"), "<title>SELECT</title>")
            .expect("write page");

        let index = ArchiveIndex::load(&manifest_path, temp.path()).expect("load");
        let select_url = canonical("/kb/en/select/");
        let select = index.locate(&select_url).expect("select");
        assert_eq!(select.id_path, "html/en/select.html");
        let content = index.read_content(&select_url, &select).expect("read");
        assert!(content.contains("SELECT"));

        let gone_url = canonical("/kb/en/gone/");
        let gone = index.locate(&gone_url).expect("gone is indexed");
        let error = index.read_content(&gone_url, &gone).expect_err("must fail");
        assert!(error.to_string().contains("https://mariadb.com/kb/en/gone"));
    }

    #[test]
    fn missing_manifest_is_a_load_error() {
        let error = ArchiveIndex::load(Path::new("/nonexistent/url_locations.txt"), Path::new("."))
            .expect_err("must fail");
        assert!(error.to_string().contains("failed to read archive manifest"));
    }
}
