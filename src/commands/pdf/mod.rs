mod outline;
mod pages;
mod render;
mod settings;


use std::path::Path;

use anyhow::{Context, Result};
use chrono::{SecondsFormat, Utc};
use tracing::{debug, info, warn};

use crate::archive::ContentSource;
use crate::catalog::Catalog;
use crate::cli::PdfArgs;
use crate::commands::{Workspace, command_line};
use crate::config::TocSection;
use crate::merge::{DocumentMerger, default_outline};
use crate::model::{LanguageOutput, RunManifest, RunOutputs};
use crate::url::UrlRules;
use crate::util::{
    ensure_directory, hash_input, now_utc_string, run_id, write_json_pretty, write_text,
};

use outline::{outline_with_pages, read_outline};
use pages::PagePreparer;
use render::{Renderer, Wkhtmltopdf};
use settings::PdfSettings;

pub fn run(args: PdfArgs, config: Option<&Path>) -> Result<()> {
    let started = Utc::now();
    let workspace = Workspace::load(config)?;
    let settings = PdfSettings::resolve(&workspace.config, &args);
    info!(
        languages = ?settings.languages,
        num_rows = settings.num_rows,
        pdf = settings.pdf,
        repeat_outline = settings.repeat_outline,
        "starting pdf run"
    );

    let mut warnings = Vec::new();
    if settings.repeat_outline && !settings.pdf {
        let message = "outline repetition needs pdf rendering; skipping it".to_string();
        warn!("{message}");
        warnings.push(message);
    }

    let archive = workspace.load_archive()?;
    let base = workspace.base_catalog(&archive, settings.num_rows)?;
    let resolver = workspace.resolver(&archive, &archive)?;
    let catalogs = resolver.resolve(&base, &settings.languages)?;
    if catalogs.is_empty() {
        warn!("no languages requested, nothing to generate");
    }

    let renderer = Wkhtmltopdf::from_config(&workspace.config.renderer)?;
    let job = PdfJob::new(
        &workspace.rules,
        &workspace.config.toc,
        &archive,
        &renderer,
        &settings,
    )?;
    ensure_directory(&settings.output_dir)?;

    let mut outputs = Vec::new();
    for language in &settings.languages {
        let Some(catalog) = catalogs.get(language) else {
            continue;
        };
        let language = language.as_str();
        debug!(
            language,
            documents = catalog.len(),
            shared_with_base = catalogs.is_borrowed(language),
            "generating language"
        );
        if catalog.is_empty() {
            let message = format!("no documents found for language '{language}'");
            warn!(language, "no documents found, skipping");
            warnings.push(message);
            continue;
        }
        let output = job
            .generate(language, catalog)
            .with_context(|| format!("failed to generate documentation for '{language}'"))?;
        outputs.push(output);
    }

    let mut inputs = Vec::new();
    if let Some(path) = &workspace.config_path {
        inputs.push(hash_input(path)?);
    }
    inputs.push(hash_input(&workspace.config.paths.catalog)?);
    inputs.push(hash_input(&workspace.config.paths.archive_manifest)?);

    let run_id = run_id(started);
    let manifest = RunManifest {
        manifest_version: 1,
        run_id: run_id.clone(),
        command: "pdf".to_string(),
        command_line: command_line(),
        started_at: started.to_rfc3339_opts(SecondsFormat::Secs, true),
        finished_at: now_utc_string(),
        config_path: workspace
            .config_path
            .as_ref()
            .map(|path| path.display().to_string()),
        inputs,
        outputs: RunOutputs::Pdf(outputs),
        warnings,
    };
    let manifest_path = settings.output_dir.join(format!("{run_id}.json"));
    write_json_pretty(&manifest_path, &manifest)?;

    info!(
        run_id = %run_id,
        manifest = %manifest_path.display(),
        "pdf run completed"
    );
    Ok(())
}

pub struct PdfJob<'a> {
    source: &'a dyn ContentSource,
    renderer: &'a dyn Renderer,
    settings: &'a PdfSettings,
    preparer: PagePreparer,
    merger: DocumentMerger<'a>,
}

impl<'a> PdfJob<'a> {
    pub fn new(
        rules: &'a UrlRules,
        toc: &'a TocSection,
        source: &'a dyn ContentSource,
        renderer: &'a dyn Renderer,
        settings: &'a PdfSettings,
    ) -> Result<Self> {
        Ok(Self {
            source,
            renderer,
            settings,
            preparer: PagePreparer::new()?,
            merger: DocumentMerger::new(rules, toc)?,
        })
    }

    pub fn generate(&self, language: &str, catalog: &Catalog) -> Result<LanguageOutput> {
        let pages = self.preparer.read_pages(catalog, self.source)?;
        let html_path = self.settings.html_path(language);
        let html = self
            .merger
            .merge(&pages, catalog, &default_outline(catalog))?;
        write_text(&html_path, &html)?;
        info!(language, html = %html_path.display(), "wrote merged html");

        let mut output = LanguageOutput {
            language: language.to_string(),
            document_count: catalog.len(),
            included_count: catalog
                .documents()
                .iter()
                .filter(|document| document.is_included())
                .count(),
            html_path: html_path.display().to_string(),
            pdf_path: None,
            outline_path: None,
            outline_repeated: false,
        };
        if !self.settings.pdf {
            return Ok(output);
        }

        let pdf_path = self.settings.pdf_path(language);
        let outline_path = self.settings.outline_path(language);
        self.renderer.render(&html_path, &pdf_path, &outline_path)?;
        output.pdf_path = Some(pdf_path.display().to_string());
        output.outline_path = Some(outline_path.display().to_string());

        if self.settings.repeat_outline {
            let entries = read_outline(&outline_path)?;
            let outline = outline_with_pages(catalog, &entries).with_context(|| {
                format!("outline dump for '{language}' does not match its catalog")
            })?;
            let html = self.merger.merge(&pages, catalog, &outline)?;
            write_text(&html_path, &html)?;
            self.renderer.render(&html_path, &pdf_path, &outline_path)?;
            output.outline_repeated = true;
            info!(language, entries = entries.len(), "rendered again with outline page numbers");
        }

        info!(language, pdf = %pdf_path.display(), "wrote pdf");
        Ok(output)
    }
}
