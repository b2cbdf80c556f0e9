use std::mem;

use anyhow::{Context, Result};
use rusqlite::Connection;

use super::categories::HelpCategory;
use super::topics::Keywords;
use super::version::Version;

/// Room left in each statement for everything around the description literal.
pub const STATEMENT_OVERHEAD: usize = 400;

pub const DEFAULT_PREAMBLE: &str = "\
delete from help_topic;
delete from help_category;
delete from help_keyword;
delete from help_relation;
";

const HELP_SCHEMA: &str = "
    CREATE TABLE help_category (
      help_category_id INTEGER PRIMARY KEY,
      name TEXT NOT NULL UNIQUE,
      parent_category_id INTEGER,
      url TEXT NOT NULL
    );

    CREATE TABLE help_topic (
      help_topic_id INTEGER PRIMARY KEY,
      help_category_id INTEGER NOT NULL,
      name TEXT NOT NULL,
      description TEXT NOT NULL,
      example TEXT NOT NULL,
      url TEXT NOT NULL
    );

    CREATE TABLE help_keyword (
      help_keyword_id INTEGER PRIMARY KEY,
      name TEXT NOT NULL UNIQUE
    );

    CREATE TABLE help_relation (
      help_topic_id INTEGER NOT NULL,
      help_keyword_id INTEGER NOT NULL,
      PRIMARY KEY (help_topic_id, help_keyword_id)
    );
";

fn escape_char(character: char) -> Option<&'static str> {
    match character {
        '\\' => Some("\\\\"),
        '\'' => Some("''"),
        '\n' => Some("\\n"),
        '\r' => Some(""),
        _ => None,
    }
}

/// Body of a single-quoted SQL string literal.
pub fn escape_sql(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for character in text.chars() {
        match escape_char(character) {
            Some(replacement) => escaped.push_str(replacement),
            None => escaped.push(character),
        }
    }
    escaped
}

/// Escaped description split into chunks of at most `limit` bytes, preferring line boundaries.
pub fn split_description(description: &str, limit: usize) -> Vec<String> {
    let limit = limit.max(1);
    let mut parts = Vec::new();
    let mut current = String::new();

    for (index, line) in description.split('\n').enumerate() {
        let mut piece = String::new();
        if index > 0 {
            piece.push_str("\\n");
        }
        piece.push_str(&escape_sql(line));

        if current.len() + piece.len() <= limit {
            current.push_str(&piece);
            continue;
        }
        if !current.is_empty() {
            parts.push(mem::take(&mut current));
        }
        if piece.len() <= limit {
            current = piece;
            continue;
        }

        let prefix = (index > 0).then(|| "\\n".to_string());
        let units = prefix.into_iter().chain(line.chars().map(|character| {
            escape_char(character).map_or_else(|| character.to_string(), str::to_string)
        }));
        for unit in units {
            if !current.is_empty() && current.len() + unit.len() > limit {
                parts.push(mem::take(&mut current));
            }
            current.push_str(&unit);
        }
    }

    parts.push(current);
    parts
}

pub fn preamble(template: &str, version: Version, date: &str) -> String {
    let mut sql = template.trim_end().to_string();
    sql.push('\n');
    sql.push_str(&insert_topic_row(
        1,
        1,
        "HELP_DATE",
        &format!("Help Contents generated from the MariaDB Knowledge Base on {date}."),
        "",
    ));
    sql.push('\n');
    sql.push_str(&insert_topic_row(
        2,
        1,
        "HELP_VERSION",
        &format!(
            "Help Contents generated for MariaDB {version} from the MariaDB Knowledge Base on {date}."
        ),
        "",
    ));
    sql.push('\n');
    sql
}

pub fn insert_category(category: &HelpCategory) -> String {
    format!(
        "insert into help_category (help_category_id,name,parent_category_id,url) values ({},'{}',{},'');",
        category.id,
        escape_sql(&category.name),
        category.parent_id
    )
}

fn insert_topic_row(
    topic_id: u32,
    category_id: u32,
    name: &str,
    description: &str,
    url: &str,
) -> String {
    format!(
        "insert into help_topic (help_topic_id,help_category_id,name,description,example,url) values ({topic_id},{category_id},'{}','{description}','','{}');",
        escape_sql(name),
        escape_sql(url)
    )
}

/// Insert for a topic; descriptions longer than `limit` continue in `CONCAT` updates.
pub fn insert_topic(
    topic_id: u32,
    category_id: u32,
    name: &str,
    description: &str,
    url: &str,
    limit: usize,
) -> (String, usize) {
    let mut parts = split_description(description, limit).into_iter();
    let first = parts.next().unwrap_or_default();
    let mut sql = insert_topic_row(topic_id, category_id, name, &first, url);
    let mut updates = 0;
    for part in parts {
        sql.push_str(&format!(
            "\nupdate help_topic set description = CONCAT(description, '{part}') WHERE help_topic_id = {topic_id};"
        ));
        updates += 1;
    }
    (sql, updates)
}

pub fn insert_keywords(keywords: &Keywords) -> Vec<String> {
    keywords
        .keywords
        .iter()
        .map(|(id, keyword)| {
            format!(
                "insert into help_keyword values ({id}, '{}');",
                escape_sql(keyword)
            )
        })
        .collect()
}

pub fn insert_relations(keywords: &Keywords) -> Vec<String> {
    keywords
        .relations
        .iter()
        .map(|(topic_id, keyword_id)| {
            format!("insert into help_relation values ({topic_id}, {keyword_id});")
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeedCounts {
    pub categories: i64,
    pub topics: i64,
    pub keywords: i64,
    pub relations: i64,
}

/// Execute generated statements against an empty in-memory help schema.
pub fn check_statements(sql: &str) -> Result<SeedCounts> {
    let connection = Connection::open_in_memory().context("failed to open in-memory database")?;
    connection
        .execute_batch(HELP_SCHEMA)
        .context("failed to create help schema")?;
    connection
        .execute_batch(sql)
        .context("generated help sql failed to execute")?;

    let count = |table: &str| -> Result<i64> {
        connection
            .query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| row.get(0))
            .with_context(|| format!("failed to count {table}"))
    };
    Ok(SeedCounts {
        categories: count("help_category")?,
        topics: count("help_topic")?,
        keywords: count("help_keyword")?,
        relations: count("help_relation")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escape_handles_quotes_backslashes_and_newlines() {
        assert_eq!(escape_sql(r"it's a\b"), r"it''s a\\b");
        assert_eq!(escape_sql("one\r\ntwo"), r"one\ntwo");
    }

    #[test]
    fn split_prefers_line_boundaries_and_reassembles() {
        let description = "first line\nsecond line\nthird's line";
        let parts = split_description(description, 20);
        assert_eq!(parts, vec!["first line", r"\nsecond line", r"\nthird''s line"]);
        assert_eq!(parts.concat(), escape_sql(description));

        assert_eq!(split_description(description, 1000), vec![escape_sql(description)]);
    }

    #[test]
    fn split_breaks_oversized_lines_without_splitting_escapes() {
        let description = "''''''";
        let parts = split_description(description, 5);
        assert_eq!(parts, vec!["''''", "''''", "''''"]);
        assert!(parts.iter().all(|part| part.len() <= 5));
        assert_eq!(parts.concat(), escape_sql(description));
    }

    #[test]
    fn long_topics_execute_as_insert_plus_concat_updates() {
        let description = (0..40)
            .map(|line| format!("line {line}: it's \\ fine"))
            .collect::<Vec<_>>()
            .join("\n");
        let (sql, updates) = insert_topic(
            3,
            1,
            "Tricky 'name'",
            &description,
            "https://mariadb.com/kb/en/x/",
            200,
        );
        assert!(updates > 0);
        assert_eq!(sql.matches("CONCAT(description, '").count(), updates);

        let connection = Connection::open_in_memory().expect("db");
        connection.execute_batch(HELP_SCHEMA).expect("schema");
        connection.execute_batch(&sql).expect("seed");
        let (name, stored): (String, String) = connection
            .query_row(
                "SELECT name, description FROM help_topic WHERE help_topic_id = 3",
                [],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .expect("topic");
        assert_eq!(name, "Tricky 'name'");
        assert_eq!(stored, escape_sql(&description).replace("''", "'"));
    }

    #[test]
    fn preamble_reserves_date_and_version_topics() {
        let version: Version = "1011".parse().expect("version");
        let sql = preamble(DEFAULT_PREAMBLE, version, "2024-05-01");
        assert!(sql.starts_with("delete from help_topic;"));
        assert!(sql.contains("values (1,1,'HELP_DATE'"));
        assert!(
            sql.contains("values (2,1,'HELP_VERSION','Help Contents generated for MariaDB 10.11")
        );
        let counts = check_statements(&sql).expect("check");
        assert_eq!(counts.topics, 2);
    }
}
