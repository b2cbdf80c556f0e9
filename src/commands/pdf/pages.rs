use anyhow::{Context, Result};
use regex::{Captures, Regex};
use tracing::error;

use crate::archive::ContentSource;
use crate::catalog::{Catalog, Document};
use crate::merge::{display_title, escape_html};

pub struct PagePreparer {
    content_section: Regex,
    body: Regex,
    first_heading: Regex,
    anchor_attr: Regex,
    local_href: Regex,
}

impl PagePreparer {
    pub fn new() -> Result<Self> {
        Ok(Self {
            content_section: Regex::new(r#"(?is)<section\s+id="content"[^>]*>(.*?)</section\s*>"#)
                .context("failed to compile content section regex")?,
            body: Regex::new(r"(?is)<body[^>]*>(.*)</body\s*>")
                .context("failed to compile body regex")?,
            first_heading: Regex::new(r"(?is)<h1[^>]*>.*?</h1\s*>")
                .context("failed to compile h1 regex")?,
            anchor_attr: Regex::new(r#"(\s(?:id|name) ?= ?")([^"]*)""#)
                .context("failed to compile anchor attribute regex")?,
            local_href: Regex::new(r#"(href ?= ?")#([^"]*)""#)
                .context("failed to compile local href regex")?,
        })
    }

    /// Cut a page to its content section and anchor it under the document id.
    pub fn prepare(&self, document: &Document, html: &str) -> String {
        let content = match self.content_section.captures(html) {
            Some(captures) => captures[1].to_string(),
            None => {
                error!(url = %document.url, "content section not found, using whole page");
                self.body
                    .captures(html)
                    .map(|captures| captures[1].to_string())
                    .unwrap_or_else(|| html.to_string())
            }
        };
        let content = self.first_heading.replace(&content, "");

        let id_path = document.id_path.as_str();
        let content = self.anchor_attr.replace_all(&content, |captures: &Captures| {
            format!("{}{id_path}{}\"", &captures[1], &captures[2])
        });
        let content = self.local_href.replace_all(&content, |captures: &Captures| {
            format!("{}#{id_path}{}\"", &captures[1], &captures[2])
        });

        format!(
            "<div class=\"kb-page\">\n<h1 id=\"{}\">{}</h1>\n{}\n</div>",
            escape_html(id_path),
            escape_html(&display_title(document)),
            content.trim()
        )
    }

    /// Prepared pages of every document, in catalog order.
    pub fn read_pages(&self, catalog: &Catalog, source: &dyn ContentSource) -> Result<Vec<String>> {
        catalog
            .documents()
            .iter()
            .map(|document| {
                let html = source.read_content(&document.url, &document.location)?;
                Ok(self.prepare(document, &html))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;
    use crate::archive::Location;
    use crate::config::UrlSection;
    use crate::url::UrlRules;

    fn document(depth_label: &str) -> Document {
        let rules = UrlRules::from_config(&UrlSection::default()).expect("rules");
        Document {
            header: "SELECT".to_string(),
            url: rules.normalize("/kb/en/select/").expect("url"),
            aliases: Vec::new(),
            location: Location {
                path: PathBuf::from("en/select.html"),
                id_path: "en/select.html".to_string(),
            },
            id_path: "en/select.html".to_string(),
            depth: 1,
            depth_label: depth_label.to_string(),
            include: 1,
            origin: None,
        }
    }

    #[test]
    fn prepare_cuts_to_content_and_prefixes_ids() {
        let preparer = PagePreparer::new().expect("preparer");
        let html = r##"<html><body><nav>menu</nav>
<section id="content" class="limited_width col-md-8 clearfix">
<h1>SELECT</h1>
<h2 id="syntax">Syntax</h2><a name="limit"></a>
<p>See <a href="#syntax">syntax</a>.</p>
</section><footer>foot</footer></body></html>"##;
        let page = preparer.prepare(&document("2"), html);

        assert!(
            page.starts_with("<div class=\"kb-page\">\n<h1 id=\"en/select.html\">2 SELECT</h1>")
        );
        assert!(page.contains(r#"<h2 id="en/select.htmlsyntax">"#));
        assert!(page.contains(r#"<a name="en/select.htmllimit">"#));
        assert!(page.contains(r##"<a href="#en/select.htmlsyntax">"##));
        assert!(!page.contains("menu"));
        assert!(!page.contains("foot"));
        assert_eq!(page.matches("<h1").count(), 1);
    }

    #[test]
    fn prepare_falls_back_to_body_without_content_section() {
        let preparer = PagePreparer::new().expect("preparer");
        let html = "<html><head><title>x</title></head><body><p>plain</p></body></html>";
        let page = preparer.prepare(&document(""), html);
        assert!(page.contains("<h1 id=\"en/select.html\">SELECT</h1>"));
        assert!(page.contains("<p>plain</p>"));
        assert!(!page.contains("<title>"));
    }
}
