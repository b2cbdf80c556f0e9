use std::path::PathBuf;

use crate::cli::PdfArgs;
use crate::config::KbConfig;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PdfSettings {
    pub languages: Vec<String>,
    pub num_rows: i64,
    pub pdf: bool,
    pub repeat_outline: bool,
    pub output_dir: PathBuf,
    pub pdf_name: String,
    pub html_name: String,
}

impl PdfSettings {
    pub fn resolve(config: &KbConfig, args: &PdfArgs) -> Self {
        let full_run = (config.full_run || args.full_run) && !args.no_full_run;
        let pdf = (config.creation.pdf || full_run || args.pdf) && !args.no_pdf;
        let repeat_outline =
            (config.creation.repeat_outline || full_run || args.repeat) && !args.no_repeat;
        let num_rows = if full_run {
            -1
        } else {
            args.num_rows.unwrap_or(config.creation.num_rows)
        };
        let languages = if args.langs.is_empty() {
            config.langs.clone()
        } else {
            args.langs.clone()
        };

        Self {
            languages,
            num_rows,
            pdf,
            repeat_outline,
            output_dir: args
                .output_dir
                .clone()
                .unwrap_or_else(|| config.paths.output_dir.clone()),
            pdf_name: args
                .pdf_name
                .clone()
                .unwrap_or_else(|| config.filenames.pdf.clone()),
            html_name: args
                .html_name
                .clone()
                .unwrap_or_else(|| config.filenames.html.clone()),
        }
    }

    pub fn html_path(&self, language: &str) -> PathBuf {
        self.output_dir.join(self.html_name.replace("{lang}", language))
    }

    pub fn pdf_path(&self, language: &str) -> PathBuf {
        self.output_dir.join(self.pdf_name.replace("{lang}", language))
    }

    pub fn outline_path(&self, language: &str) -> PathBuf {
        self.output_dir.join(format!("outline-{language}.xml"))
    }
}
