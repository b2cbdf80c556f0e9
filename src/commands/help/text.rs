use anyhow::{Context, Result};
use regex::Regex;
use tracing::error;

use crate::util::unescape_html;

const TITLE_SUFFIX: &str = " - MariaDB Knowledge Base";

pub struct TextExtractor {
    content_section: Regex,
    junk: Vec<Regex>,
    first_heading: Regex,
    see_also: Regex,
    line_breaks: Regex,
    list_items: Regex,
    table_cells: Regex,
    tags: Regex,
    trailing_space: Regex,
    blank_runs: Regex,
    title: Regex,
}

impl TextExtractor {
    pub fn new() -> Result<Self> {
        let compile = |pattern: &str, what: &str| {
            Regex::new(pattern).with_context(|| format!("failed to compile {what} regex"))
        };

        let junk = [
            r#"(?is)<div[^>]*\bid="content_disclaimer"[^>]*>.*?</div\s*>"#,
            r#"(?is)<div[^>]*\bid="comments"[^>]*>.*"#,
            r"(?is)<h2[^>]*>\s*Comments\s*</h2\s*>",
            r#"(?is)<div[^>]*\bid="subscribe"[^>]*>.*?</div\s*>"#,
            r#"(?is)<div[^>]*\bclass="simple_section_nav"[^>]*>.*?</div\s*>"#,
            r#"(?is)<div[^>]*\bclass="table_of_contents"[^>]*>.*?</div\s*>"#,
            r"(?is)<script[^>]*>.*?</script\s*>",
            r"(?is)<style[^>]*>.*?</style\s*>",
        ]
        .into_iter()
        .map(|pattern| compile(pattern, "junk block"))
        .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            content_section: compile(
                r#"(?is)<section\s+id="content"[^>]*>(.*?)</section\s*>"#,
                "content section",
            )?,
            junk,
            first_heading: compile(r"(?is)<h1[^>]*>.*?</h1\s*>", "h1")?,
            see_also: compile(
                r#"(?is)<h[2-6][^>]*\bid="see-also"[^>]*>.*?</h[2-6]\s*>\s*(?:<ul[^>]*>.*?</ul\s*>|<ol[^>]*>.*?</ol\s*>|<p[^>]*>.*?</p\s*>|<div[^>]*>.*?</div\s*>)?"#,
                "see also",
            )?,
            line_breaks: compile(
                r"(?i)<br\s*/?>|</(?:p|div|h[1-6]|pre|tr|ul|ol|table|blockquote)\s*>",
                "line break",
            )?,
            list_items: compile(r"(?i)<li[^>]*>", "list item")?,
            table_cells: compile(r"(?i)</t[dh]\s*>", "table cell")?,
            tags: compile(r"(?s)<[^>]*>", "tag")?,
            trailing_space: compile(r"(?m)[ \t]+$", "trailing space")?,
            blank_runs: compile(r"\n{3,}", "blank line")?,
            title: compile(r"(?is)<title[^>]*>(.*?)</title\s*>", "title")?,
        })
    }

    /// Plain-text description of an archived page.
    pub fn extract_text(&self, html: &str, url: &str) -> String {
        let content = match self.content_section.captures(html) {
            Some(captures) => captures[1].to_string(),
            None => {
                error!(url, "content section not found, using whole page");
                html.to_string()
            }
        };

        let mut content = content;
        for junk in &self.junk {
            content = junk.replace_all(&content, "").into_owned();
        }
        content = self.first_heading.replace(&content, "").into_owned();
        content = self.see_also.replace_all(&content, "").into_owned();

        content = self.line_breaks.replace_all(&content, "\n").into_owned();
        content = self.list_items.replace_all(&content, "\n* ").into_owned();
        content = self.table_cells.replace_all(&content, "\t").into_owned();
        content = self.tags.replace_all(&content, "").into_owned();

        let text = unescape_html(&content).replace('\u{00a0}', " ").replace('\r', "");
        let text = self.trailing_space.replace_all(&text, "");
        let text = self.blank_runs.replace_all(&text, "\n\n");
        text.trim().to_string()
    }

    /// Topic name from the page `<title>`, without the site suffix.
    pub fn page_name(&self, html: &str, url: &str) -> String {
        let Some(captures) = self.title.captures(html) else {
            error!(url, "title tag not found, using an empty topic name");
            return String::new();
        };
        let title = captures[1].trim();
        let title = title.strip_suffix(TITLE_SUFFIX).unwrap_or(title);
        unescape_html(title).trim().to_string()
    }
}
