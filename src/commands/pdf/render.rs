use std::path::Path;
use std::process::Command;

use anyhow::{Context, Result, bail};
use tracing::{debug, info};

use crate::config::RendererSection;

pub trait Renderer {
    /// Render `html_path` to `pdf_path`, dumping the document outline to `outline_path`.
    fn render(&self, html_path: &Path, pdf_path: &Path, outline_path: &Path) -> Result<()>;
}

#[derive(Debug, Clone)]
pub struct Wkhtmltopdf {
    binary: String,
    options: Vec<String>,
}

impl Wkhtmltopdf {
    pub fn from_config(section: &RendererSection) -> Result<Self> {
        let options = section
            .option_args()
            .context("invalid [renderer] options")?;
        Ok(Self {
            binary: section.binary.clone(),
            options,
        })
    }

    pub fn arguments(&self, html_path: &Path, pdf_path: &Path, outline_path: &Path) -> Vec<String> {
        let mut args = self.options.clone();
        args.push("--dump-outline".to_string());
        args.push(outline_path.display().to_string());
        args.push(html_path.display().to_string());
        args.push(pdf_path.display().to_string());
        args
    }
}

impl Renderer for Wkhtmltopdf {
    fn render(&self, html_path: &Path, pdf_path: &Path, outline_path: &Path) -> Result<()> {
        let args = self.arguments(html_path, pdf_path, outline_path);
        debug!(binary = %self.binary, args = ?args, "invoking renderer");
        info!(html = %html_path.display(), pdf = %pdf_path.display(), "rendering pdf");

        let output = Command::new(&self.binary)
            .args(&args)
            .output()
            .with_context(|| {
                format!(
                    "failed to execute {} for {}",
                    self.binary,
                    html_path.display()
                )
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            bail!(
                "{} returned non-zero exit status for {}: {}",
                self.binary,
                html_path.display(),
                stderr.trim()
            );
        }

        if !pdf_path.exists() {
            bail!(
                "{} did not produce expected pdf {}",
                self.binary,
                pdf_path.display()
            );
        }
        Ok(())
    }
}
