use std::path::Path;

use anyhow::Result;
use tracing::info;

use crate::cli::CatalogArgs;
use crate::commands::Workspace;
use crate::model::{CatalogEntry, CatalogManifest, LanguageCatalog};
use crate::util::{now_utc_string, write_json_pretty};

pub fn run(args: CatalogArgs, config: Option<&Path>) -> Result<()> {
    let workspace = Workspace::load(config)?;
    let manifest = build_manifest(&workspace, &args.langs, args.num_rows)?;

    if args.dry_run {
        for language in &manifest.languages {
            info!(
                language = %language.language,
                documents = language.document_count,
                "catalog dry-run"
            );
        }
        info!(languages = manifest.languages.len(), "catalog dry-run complete");
        return Ok(());
    }

    let manifest_path = args
        .output
        .unwrap_or_else(|| workspace.config.paths.output_dir.join("catalog.json"));
    write_json_pretty(&manifest_path, &manifest)?;
    info!(path = %manifest_path.display(), "wrote catalog manifest");
    Ok(())
}

pub fn build_manifest(
    workspace: &Workspace,
    langs: &[String],
    num_rows: Option<i64>,
) -> Result<CatalogManifest> {
    let languages = workspace.languages_or_default(langs);
    let num_rows = num_rows.unwrap_or(workspace.config.creation.num_rows);

    let archive = workspace.load_archive()?;
    let base = workspace.base_catalog(&archive, num_rows)?;
    let resolver = workspace.resolver(&archive, &archive)?;
    let catalogs = resolver.resolve(&base, &languages)?;
    info!(languages = catalogs.len(), "resolved language catalogs");

    let languages = catalogs
        .iter()
        .map(|(language, catalog)| LanguageCatalog {
            language: language.to_string(),
            document_count: catalog.len(),
            documents: catalog.documents().iter().map(CatalogEntry::from).collect(),
        })
        .collect();

    Ok(CatalogManifest {
        manifest_version: 1,
        generated_at: now_utc_string(),
        catalog_path: workspace.config.paths.catalog.display().to_string(),
        archive_manifest_path: workspace
            .config
            .paths
            .archive_manifest
            .display()
            .to_string(),
        languages,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::test_support::{KbFixture, kb_page};

    fn fixture() -> KbFixture {
        let fixture = KbFixture::new();
        fixture.manifest(
            "Header,URL,Include,Depth,Duplicate slugs\n\
             Joins,https://mariadb.com/kb/en/joins/,1,1,joining-tables\n\
             INNER JOIN,https://mariadb.com/kb/en/inner-join/,1,2,\n",
        );
        fixture.page(
            "https://mariadb.com/kb/en/joins/",
            "html/en/joins.html",
            &kb_page(
                "Joins",
                r#"<h3>Localized Versions</h3>
<ul><li><a href="/kb/de/joins/">Joins</a> [de]</li><li><a href="/kb/fr/jointures/">Jointures</a> [fr]</li></ul>"#,
            ),
        );
        fixture.page(
            "https://mariadb.com/kb/en/inner-join/",
            "html/en/inner-join.html",
            &kb_page("INNER JOIN", "<p>No translations.</p>"),
        );
        fixture.page(
            "https://mariadb.com/kb/de/joins/",
            "html/de/joins.html",
            &kb_page("Joins", "<p>Verbindungen.</p>"),
        );
        fixture
    }

    #[test]
    fn manifest_lists_every_requested_language() {
        let fixture = fixture();
        let workspace = fixture.workspace();
        let manifest = build_manifest(&workspace, &["en".to_string(), "de".to_string()], None)
            .expect("manifest");

        assert_eq!(manifest.languages.len(), 2);
        let de = &manifest.languages[0];
        assert_eq!(de.language, "de");
        assert_eq!(de.document_count, 1);
        assert_eq!(de.documents[0].id_path, "html/de/joins.html");
        assert_eq!(
            de.documents[0].origin.as_deref(),
            Some("https://mariadb.com/kb/en/joins")
        );
        assert_eq!(de.documents[0].depth_label, "1");

        let en = &manifest.languages[1];
        assert_eq!(en.document_count, 2);
        assert_eq!(en.documents[1].depth_label, "1.1");
        assert_eq!(
            en.documents[0].aliases,
            vec!["https://mariadb.com/kb/en/joining-tables".to_string()]
        );

        let json = serde_json::to_value(&manifest).expect("json");
        assert_eq!(json["languages"][1]["documents"][0]["idPath"], "html/en/joins.html");
        assert_eq!(json["languages"][1]["documents"][1]["depthLabel"], "1.1");
    }

    #[test]
    fn run_writes_json_unless_dry_run() {
        let fixture = fixture();
        let config_path = fixture.dir.path().join("kbdocs.toml");
        std::fs::write(
            &config_path,
            toml::to_string(&fixture.config).expect("serialize config"),
        )
        .expect("write config");
        let output = fixture.dir.path().join("out/catalog.json");

        run(
            CatalogArgs {
                langs: Vec::new(),
                num_rows: None,
                output: Some(output.clone()),
                dry_run: true,
            },
            Some(&config_path),
        )
        .expect("dry run");
        assert!(!output.exists());

        run(
            CatalogArgs {
                langs: Vec::new(),
                num_rows: Some(1),
                output: Some(output.clone()),
                dry_run: false,
            },
            Some(&config_path),
        )
        .expect("run");
        let json: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&output).expect("read")).expect("json");
        assert_eq!(json["languages"][0]["language"], "en");
        assert_eq!(json["languages"][0]["document_count"], 1);
    }
}
