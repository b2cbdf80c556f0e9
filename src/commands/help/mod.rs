mod categories;
mod sql;
mod text;
mod topics;
mod version;


use std::fs;
use std::path::Path;

use anyhow::{Context, Result, bail};
use chrono::{SecondsFormat, Utc};
use tracing::{debug, info};

use crate::archive::{ArchiveIndex, ContentSource};
use crate::catalog::{ManifestRow, read_manifest};
use crate::cli::HelpArgs;
use crate::commands::{Workspace, command_line};
use crate::model::{HelpOutput, RunManifest, RunOutputs};
use crate::url::UrlRules;
use crate::util::{
    ensure_directory, hash_input, now_utc_string, run_id, write_json_pretty, write_text,
};

use categories::{CategoryRow, HelpCategories, read_categories};
use sql::{
    DEFAULT_PREAMBLE, STATEMENT_OVERHEAD, SeedCounts, check_statements, insert_category,
    insert_keywords, insert_relations, insert_topic, preamble,
};
use text::TextExtractor;
use topics::{FIRST_TOPIC_ID, collect_keywords, select_help_items};
use version::Version;

pub fn run(args: HelpArgs, config: Option<&Path>) -> Result<()> {
    let started = Utc::now();
    let versions = args
        .versions
        .iter()
        .map(|raw| raw.parse::<Version>())
        .collect::<Result<Vec<_>>>()?;
    let limit = description_limit(args.length)?;

    let workspace = Workspace::load(config)?;
    let paths = &workspace.config.paths;
    let output_dir = args
        .output_dir
        .clone()
        .unwrap_or_else(|| paths.output_dir.clone());
    info!(
        versions = ?versions.iter().map(ToString::to_string).collect::<Vec<_>>(),
        length = args.length,
        check = args.check,
        "starting help run"
    );

    let archive = workspace.load_archive()?;
    let rows = read_manifest(&paths.catalog)?;
    let category_rows = read_categories(&paths.categories)?;
    let preamble_template = match &paths.help_preamble {
        Some(path) => fs::read_to_string(path)
            .with_context(|| format!("failed to read help preamble {}", path.display()))?,
        None => DEFAULT_PREAMBLE.to_string(),
    };

    let generator = HelpGenerator::new(&workspace.rules, &archive, &archive, limit)?;
    ensure_directory(&output_dir)?;
    let date = started.format("%Y-%m-%d").to_string();

    let mut warnings = Vec::new();
    let mut outputs = Vec::new();
    for version in versions {
        let seed = generator
            .generate(&rows, &category_rows, version, &mut warnings)
            .with_context(|| format!("failed to generate help tables for {version}"))?;
        if args.check {
            seed.check()
                .with_context(|| format!("help tables for {version} failed the sql check"))?;
        }

        let sql_path = output_dir.join(format!("fill_help_tables-{}.sql", version.file_suffix()));
        write_text(&sql_path, &seed.render(&preamble_template, &date))?;
        info!(
            version = %version,
            topics = seed.topics.len(),
            keywords = seed.keywords.len(),
            path = %sql_path.display(),
            "wrote help tables"
        );
        outputs.push(HelpOutput {
            version: version.to_string(),
            sql_path: sql_path.display().to_string(),
            category_count: seed.categories.len(),
            topic_count: seed.topics.len(),
            keyword_count: seed.keywords.len(),
            relation_count: seed.relations.len(),
            checked: args.check,
        });
    }

    let mut inputs = Vec::new();
    if let Some(path) = &workspace.config_path {
        inputs.push(hash_input(path)?);
    }
    inputs.push(hash_input(&paths.catalog)?);
    inputs.push(hash_input(&paths.categories)?);
    inputs.push(hash_input(&paths.archive_manifest)?);
    if let Some(path) = &paths.help_preamble {
        inputs.push(hash_input(path)?);
    }

    let run_id = run_id(started);
    let manifest = RunManifest {
        manifest_version: 1,
        run_id: run_id.clone(),
        command: "help".to_string(),
        command_line: command_line(),
        started_at: started.to_rfc3339_opts(SecondsFormat::Secs, true),
        finished_at: now_utc_string(),
        config_path: workspace
            .config_path
            .as_ref()
            .map(|path| path.display().to_string()),
        inputs,
        outputs: RunOutputs::Help(outputs),
        warnings,
    };
    let manifest_path = output_dir.join(format!("{run_id}.json"));
    write_json_pretty(&manifest_path, &manifest)?;

    info!(run_id = %run_id, manifest = %manifest_path.display(), "help run completed");
    Ok(())
}

fn description_limit(length: usize) -> Result<usize> {
    match length.checked_sub(STATEMENT_OVERHEAD) {
        Some(limit) if limit > 0 => Ok(limit),
        _ => bail!("--length must be greater than {STATEMENT_OVERHEAD}, got {length}"),
    }
}

#[derive(Debug, Clone)]
pub struct HelpSeed {
    pub version: Version,
    pub categories: Vec<String>,
    pub topics: Vec<String>,
    pub keywords: Vec<String>,
    pub relations: Vec<String>,
}

impl HelpSeed {
    /// Generated statements in load order, without the preamble.
    pub fn body(&self) -> String {
        [&self.categories, &self.topics, &self.keywords, &self.relations]
            .iter()
            .map(|section| section.join("\n"))
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    pub fn render(&self, preamble_template: &str, date: &str) -> String {
        let header = preamble(preamble_template, self.version, date);
        format!("{header}\n{}\n", self.body())
    }

    pub fn check(&self) -> Result<SeedCounts> {
        let counts = check_statements(&self.body())?;
        let expected = [
            ("help_category", counts.categories, self.categories.len()),
            ("help_topic", counts.topics, self.topics.len()),
            ("help_keyword", counts.keywords, self.keywords.len()),
            ("help_relation", counts.relations, self.relations.len()),
        ];
        for (table, actual, wanted) in expected {
            if usize::try_from(actual).ok() != Some(wanted) {
                bail!("{table} holds {actual} rows after the check, expected {wanted}");
            }
        }
        info!(
            categories = counts.categories,
            topics = counts.topics,
            keywords = counts.keywords,
            relations = counts.relations,
            "help sql check passed"
        );
        Ok(counts)
    }
}

pub struct HelpGenerator<'a> {
    rules: &'a UrlRules,
    archive: &'a ArchiveIndex,
    source: &'a dyn ContentSource,
    extractor: TextExtractor,
    limit: usize,
}

impl<'a> HelpGenerator<'a> {
    pub fn new(
        rules: &'a UrlRules,
        archive: &'a ArchiveIndex,
        source: &'a dyn ContentSource,
        limit: usize,
    ) -> Result<Self> {
        Ok(Self {
            rules,
            archive,
            source,
            extractor: TextExtractor::new()?,
            limit,
        })
    }

    pub fn generate(
        &self,
        rows: &[ManifestRow],
        category_rows: &[CategoryRow],
        version: Version,
        warnings: &mut Vec<String>,
    ) -> Result<HelpSeed> {
        let categories = HelpCategories::select(category_rows, version)?;
        let items = select_help_items(rows, &categories, version, warnings)?;
        let keywords = collect_keywords(&items);
        info!(
            version = %version,
            categories = categories.len(),
            topics = items.len(),
            "selected help topics"
        );

        let mut topics = Vec::with_capacity(items.len());
        for (topic_id, item) in (FIRST_TOPIC_ID..).zip(&items) {
            let Some(url) = self.rules.normalize(&item.url) else {
                bail!("help url rejected by normalizer: '{}'", item.url);
            };
            let location = self.archive.locate(&url)?;
            let html = self.source.read_content(&url, &location)?;
            let name = self.extractor.page_name(&html, url.as_str());
            let description = self.extractor.extract_text(&html, url.as_str());

            let (statement, updates) = insert_topic(
                topic_id,
                item.category_id,
                &name,
                &description,
                &item.url,
                self.limit,
            );
            debug!(topic_id, url = %url, updates, "generated help topic");
            topics.push(statement);
        }

        Ok(HelpSeed {
            version,
            categories: categories.categories().iter().map(insert_category).collect(),
            topics,
            keywords: insert_keywords(&keywords),
            relations: insert_relations(&keywords),
        })
    }
}
