use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "kbdocs",
    version,
    about = "Build merged documentation and help tables from an archived knowledge base"
)]
pub struct Cli {
    /// TOML configuration file (defaults to ./kbdocs.toml when present)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[arg(short, long, global = true, default_value_t = false, conflicts_with = "verbose")]
    pub quiet: bool,

    #[arg(short, long, global = true, default_value_t = false)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Resolve the url manifest into per-language catalogs
    Catalog(CatalogArgs),
    /// Merge archived pages into one html document per language and render it
    Pdf(PdfArgs),
    /// Generate help-table seed sql per server version
    Help(HelpArgs),
    /// Print the canonical form of raw knowledge base urls
    Normalize(NormalizeArgs),
}

#[derive(Args, Debug, Clone)]
pub struct CatalogArgs {
    #[arg(short = 'l', long = "langs", num_args = 1..)]
    pub langs: Vec<String>,

    #[arg(short = 'n', long)]
    pub num_rows: Option<i64>,

    #[arg(long)]
    pub output: Option<PathBuf>,

    #[arg(long, default_value_t = false)]
    pub dry_run: bool,
}

#[derive(Args, Debug, Clone)]
pub struct PdfArgs {
    #[arg(short = 'l', long = "langs", num_args = 1..)]
    pub langs: Vec<String>,

    #[arg(short = 'n', long)]
    pub num_rows: Option<i64>,

    #[arg(short = 'f', long, default_value_t = false, conflicts_with = "no_full_run")]
    pub full_run: bool,

    #[arg(long, default_value_t = false)]
    pub no_full_run: bool,

    #[arg(long, default_value_t = false, conflicts_with = "no_pdf")]
    pub pdf: bool,

    #[arg(long, default_value_t = false)]
    pub no_pdf: bool,

    #[arg(long, default_value_t = false, conflicts_with = "no_repeat")]
    pub repeat: bool,

    #[arg(long, default_value_t = false)]
    pub no_repeat: bool,

    /// Output pdf file name; `{lang}` is replaced by the language
    #[arg(short = 'o', long = "pdf-name")]
    pub pdf_name: Option<String>,

    /// Output html file name; `{lang}` is replaced by the language
    #[arg(long = "html-name")]
    pub html_name: Option<String>,

    #[arg(long)]
    pub output_dir: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
pub struct HelpArgs {
    /// Server versions as digits, e.g. 106 or 1011
    #[arg(long = "versions", num_args = 1.., required = true)]
    pub versions: Vec<String>,

    /// Maximum length of one generated statement
    #[arg(short = 'L', long, default_value_t = 15_000)]
    pub length: usize,

    #[arg(long)]
    pub output_dir: Option<PathBuf>,

    /// Execute the generated statements against an in-memory help schema first
    #[arg(long, default_value_t = false)]
    pub check: bool,
}

#[derive(Args, Debug, Clone)]
pub struct NormalizeArgs {
    /// File with one raw url per line (stdin when omitted)
    #[arg(long)]
    pub input: Option<PathBuf>,

    /// File with the expected canonical url for each input line
    #[arg(long)]
    pub expect: Option<PathBuf>,
}
