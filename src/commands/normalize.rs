use std::fs;
use std::io::{self, Read, Write};
use std::path::Path;

use anyhow::{Context, Result, bail};
use tracing::{info, warn};

use crate::cli::NormalizeArgs;
use crate::commands::Workspace;
use crate::url::UrlRules;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mismatch {
    pub line: usize,
    pub input: String,
    pub expected: String,
    pub actual: String,
}

pub fn run(args: NormalizeArgs, config: Option<&Path>) -> Result<()> {
    let workspace = Workspace::load(config)?;
    let input = match &args.input {
        Some(path) => read_lines_file(path)?,
        None => {
            let mut buffer = String::new();
            io::stdin()
                .read_to_string(&mut buffer)
                .context("failed to read urls from stdin")?;
            buffer
        }
    };

    let Some(expect_path) = &args.expect else {
        let stdout = io::stdout();
        let mut out = stdout.lock();
        for line in normalize_lines(&workspace.rules, &input) {
            writeln!(out, "{line}").context("failed to write to stdout")?;
        }
        return Ok(());
    };

    let expected = read_lines_file(expect_path)?;
    let mismatches = check_expectations(&workspace.rules, &input, &expected)?;
    for mismatch in &mismatches {
        warn!(
            line = mismatch.line,
            input = %mismatch.input,
            expected = %mismatch.expected,
            actual = %mismatch.actual,
            "url normalization mismatch"
        );
    }
    let checked = input.split('\n').count();
    if !mismatches.is_empty() {
        bail!("{} of {checked} urls did not normalize as expected", mismatches.len());
    }
    info!(checked, "all urls normalized as expected");
    Ok(())
}

fn read_lines_file(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))
}

/// One output line per input line; rejected urls become empty lines.
pub fn normalize_lines(rules: &UrlRules, text: &str) -> Vec<String> {
    text.lines()
        .map(|line| {
            rules
                .normalize(line)
                .map(|url| url.to_string())
                .unwrap_or_default()
        })
        .collect()
}

pub fn check_expectations(rules: &UrlRules, input: &str, expected: &str) -> Result<Vec<Mismatch>> {
    let inputs: Vec<&str> = input.split('\n').map(|line| line.trim_end_matches('\r')).collect();
    let outputs: Vec<&str> = expected
        .split('\n')
        .map(|line| line.trim_end_matches('\r'))
        .collect();
    if inputs.len() != outputs.len() {
        bail!(
            "input has {} lines but the expectations have {}",
            inputs.len(),
            outputs.len()
        );
    }

    Ok(inputs
        .into_iter()
        .zip(outputs)
        .enumerate()
        .filter_map(|(index, (raw, wanted))| {
            let actual = rules
                .normalize(raw)
                .map(|url| url.to_string())
                .unwrap_or_default();
            (actual != wanted).then(|| Mismatch {
                line: index + 1,
                input: raw.to_string(),
                expected: wanted.to_string(),
                actual,
            })
        })
        .collect())
}
