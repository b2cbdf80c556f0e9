use std::fs;

use tempfile::{TempDir, tempdir};

use crate::commands::Workspace;
use crate::config::KbConfig;

pub struct KbFixture {
    pub dir: TempDir,
    pub config: KbConfig,
}

impl KbFixture {
    pub fn new() -> Self {
        let dir = tempdir().expect("tempdir");
        let mut config = KbConfig::default();
        config.paths.catalog = dir.path().join("kb_urls.csv");
        config.paths.archive_manifest = dir.path().join("url_locations.txt");
        config.paths.categories = dir.path().join("help_cats.csv");
        config.paths.output_dir = dir.path().join("output");
        Self { dir, config }
    }

    pub fn manifest(&self, csv: &str) {
        fs::write(&self.config.paths.catalog, csv).expect("write url manifest");
    }

    pub fn categories(&self, csv: &str) {
        fs::write(&self.config.paths.categories, csv).expect("write categories");
    }

    /// Archive `html` for `url` at `id_path` and index it.
    pub fn page(&self, url: &str, id_path: &str, html: &str) {
        let path = self.dir.path().join(id_path);
        fs::create_dir_all(path.parent().expect("page parent")).expect("mkdir");
        fs::write(&path, html).expect("write page");

        let manifest = &self.config.paths.archive_manifest;
        let mut index = fs::read_to_string(manifest).unwrap_or_default();
        index.push_str(&format!("{url} {id_path}\n"));
        fs::write(manifest, index).expect("write archive manifest");
    }

    pub fn workspace(&self) -> Workspace {
        Workspace::from_config(self.config.clone()).expect("workspace")
    }
}

pub fn kb_page(title: &str, content: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html><head><title>{title} - MariaDB Knowledge Base</title></head>\n\
         <body><nav>Navigation</nav>\n\
         <section id=\"content\" class=\"limited_width col-md-8 clearfix\">\n\
         <h1>{title}</h1>\n{content}\n</section>\n<footer>Footer</footer></body></html>\n"
    )
}
