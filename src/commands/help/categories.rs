use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, Result, bail};
use serde::Deserialize;

use super::version::{Inclusion, Version};

pub const ROOT_CATEGORY: &str = "0";

#[derive(Debug, Clone, Deserialize)]
pub struct CategoryRow {
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Parent")]
    pub parent: String,
    #[serde(rename = "Include")]
    pub include: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HelpCategory {
    pub id: u32,
    pub name: String,
    pub parent_id: u32,
}

#[derive(Debug, Clone, Default)]
pub struct HelpCategories {
    categories: Vec<HelpCategory>,
    ids: HashMap<String, u32>,
}

impl HelpCategories {
    /// Number the categories available in `version` from 1, in file order.
    pub fn select(rows: &[CategoryRow], version: Version) -> Result<Self> {
        let mut included = Vec::new();
        for row in rows {
            let inclusion = Inclusion::parse(&row.include)
                .with_context(|| format!("invalid Include for help category '{}'", row.name))?;
            if inclusion.includes(version) {
                included.push(row);
            }
        }

        let mut ids = HashMap::from([(ROOT_CATEGORY.to_string(), 0)]);
        for (id, row) in (1..).zip(&included) {
            if ids.insert(row.name.trim().to_string(), id).is_some() {
                bail!("duplicate help category '{}'", row.name);
            }
        }

        let mut categories = Vec::with_capacity(included.len());
        for (id, row) in (1..).zip(&included) {
            let Some(&parent_id) = ids.get(row.parent.trim()) else {
                bail!(
                    "help category '{}' has unknown parent '{}' for {version}",
                    row.name,
                    row.parent
                );
            };
            categories.push(HelpCategory {
                id,
                name: row.name.trim().to_string(),
                parent_id,
            });
        }

        Ok(Self { categories, ids })
    }

    pub fn id_of(&self, name: &str) -> Option<u32> {
        self.ids.get(name.trim()).copied()
    }

    pub fn categories(&self) -> &[HelpCategory] {
        &self.categories
    }

    pub fn len(&self) -> usize {
        self.categories.len()
    }
}

pub fn read_categories(path: &Path) -> Result<Vec<CategoryRow>> {
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("failed to read help categories {}", path.display()))?;
    reader
        .deserialize::<CategoryRow>()
        .enumerate()
        .map(|(index, record)| {
            record.with_context(|| {
                format!(
                    "failed to parse help category row {} in {}",
                    index + 2,
                    path.display()
                )
            })
        })
        .collect()
}
