use std::fmt::Write as _;

use anyhow::Result;
use tracing::info;

use crate::catalog::{Catalog, Document};
use crate::config::TocSection;
use crate::links::{LinkInternalizer, absolutize};
use crate::url::UrlRules;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TocItem {
    pub header: String,
    pub page_num: u32,
    pub link_id: String,
    pub depth: usize,
}

pub fn display_title(document: &Document) -> String {
    if document.depth_label.is_empty() {
        document.header.clone()
    } else {
        format!("{} {}", document.depth_label, document.header)
    }
}

pub fn default_outline(catalog: &Catalog) -> Vec<TocItem> {
    catalog
        .documents()
        .iter()
        .map(|document| TocItem {
            header: display_title(document),
            page_num: 0,
            link_id: document.id_path.clone(),
            depth: document.depth,
        })
        .collect()
}

pub fn create_contents(outline: &[TocItem], toc: &TocSection) -> Result<String> {
    let mut html = String::from("<div class=\"pdftoc\">\n<h1>Contents</h1>\n");
    for item in outline {
        let (font_size, indent, margin) = if item.depth <= 1 {
            (&toc.chapter_font_size, &toc.chapter_indent, &toc.chapter_margin)
        } else {
            (&toc.main_font_size, &toc.main_indent, &toc.main_margin)
        };
        let page = if item.page_num == 0 {
            String::new()
        } else {
            item.page_num.to_string()
        };
        writeln!(
            html,
            "<div style=\"font-size: {font_size}; padding-left: {indent}; margin: {margin} 0;\">\
             <a class=\"\" href=\"#{}\"><div class=\"pdfhorizontal_dotted_line\">\
             <span>{}</span><span style=\"float: right;\">{page}</span></div></a></div>",
            escape_html(&item.link_id),
            escape_html(&item.header),
        )?;
    }
    html.push_str("</div>\n<div style=\"page-break-after: always;\"></div>\n");
    Ok(html)
}

pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for character in text.chars() {
        match character {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            other => escaped.push(other),
        }
    }
    escaped
}

pub struct DocumentMerger<'a> {
    rules: &'a UrlRules,
    toc: &'a TocSection,
    internalizer: LinkInternalizer,
}

impl<'a> DocumentMerger<'a> {
    pub fn new(rules: &'a UrlRules, toc: &'a TocSection) -> Result<Self> {
        Ok(Self {
            rules,
            toc,
            internalizer: LinkInternalizer::new()?,
        })
    }

    /// Contents, then pages; links are absolutized before they are internalized.
    pub fn merge(
        &self,
        pages: &[String],
        catalog: &Catalog,
        outline: &[TocItem],
    ) -> Result<String> {
        info!(pages = pages.len(), documents = catalog.len(), "merging html");
        let mut html = create_contents(outline, self.toc)?;
        html.push_str(&pages.join("\n"));
        let html = absolutize(&html, self.rules);
        let html = self.internalizer.internalize(&html, catalog);
        Ok(format!("{START_BOILERPLATE}{html}{END_BOILERPLATE}"))
    }
}

const END_BOILERPLATE: &str = "\n\n</body>\n</html>";

const START_BOILERPLATE: &str = r#"<!DOCTYPE html>
<html>
    <head>
        <meta charset="utf-8">
        <meta http-equiv="X-UA-Compatible" content="IE=edge">
        <title>MariaDB Server Documentation</title>
        <meta name="viewport" content="width=device-width, initial-scale=1">
        <meta http-equiv="Content-Type" content="text/html; charset=utf-8" />
        <style>
            body {
                font-family: "Arial";
            }
            .kb-page {
                page-break-before: always;
            }
            .pdfhorizontal_dotted_line {
                position: relative;
            }
            .pdfhorizontal_dotted_line span {
                display: inline-block;
                background: #fff;
                position: relative;
                z-index: 1;
            }
            .pdfhorizontal_dotted_line:after {
                content: '';
                position: absolute;
                top: 70%;
                left: 0;
                right: 0;
                z-index: -1;
                border-top: 2px dotted black;
            }
            a[href ^= "http"]:after {
                content: " \2197";
            }
            a[class=""]:after {
                content: "";
            }
        </style>
    </head>
<body>

"#;
