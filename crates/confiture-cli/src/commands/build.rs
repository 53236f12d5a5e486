//! `confiture build` — prints the fingerprinted schema (spec §6).

use crate::config::ConfitureConfig;
use crate::db;
use crate::error::CliError;
use confiture_core::Render;
use serde::Serialize;
use std::path::Path;

pub enum Source {
    Dir(String),
    Db,
}

impl std::str::FromStr for Source {
    type Err = CliError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == "db" {
            Ok(Source::Db)
        } else {
            Ok(Source::Dir(s.to_string()))
        }
    }
}

#[derive(Serialize)]
pub struct BuildResult {
    pub source: String,
    pub object_count: usize,
    pub fingerprint: String,
    /// Present only when `--to` was given: the second endpoint's
    /// description, fingerprint, and whether it matches `fingerprint`.
    pub compared_to: Option<ComparedTo>,
}

#[derive(Serialize)]
pub struct ComparedTo {
    pub source: String,
    pub fingerprint: String,
    pub matches: bool,
}

impl Render for BuildResult {
    fn schema_name(&self) -> &'static str {
        "confiture.build.v1"
    }

    fn to_text(&self) -> String {
        let mut text = format!(
            "{}\n  objects:     {}\n  fingerprint: {}",
            crate::output::heading(&format!("schema from {}", self.source)),
            self.object_count,
            self.fingerprint
        );
        if let Some(to) = &self.compared_to {
            text.push_str(&format!(
                "\n{}\n  fingerprint: {}\n  {}",
                crate::output::heading(&format!("schema from {}", to.source)),
                to.fingerprint,
                if to.matches {
                    crate::output::success("fingerprints match")
                } else {
                    crate::output::warning("fingerprints differ")
                }
            ));
        }
        text
    }

    fn csv_rows(&self) -> Vec<Vec<String>> {
        let mut rows = vec![
            vec!["source".into(), "object_count".into(), "fingerprint".into()],
            vec![
                self.source.clone(),
                self.object_count.to_string(),
                self.fingerprint.clone(),
            ],
        ];
        if let Some(to) = &self.compared_to {
            rows.push(vec![to.source.clone(), String::new(), to.fingerprint.clone()]);
        }
        rows
    }
}

async fn resolve(
    config: &ConfitureConfig,
    endpoint: Option<&str>,
    default_to_schema_root: bool,
) -> Result<Option<(String, confiture_core::SchemaState)>, CliError> {
    let source = match endpoint {
        Some(s) => s.parse::<Source>()?,
        None if default_to_schema_root => Source::Dir(config.schema.root.clone()),
        None => return Ok(None),
    };
    Ok(Some(match source {
        Source::Dir(root) => {
            let state = confiture_schema::parse_tree(Path::new(&root), &config.schema.load_order)?;
            (root, state)
        }
        Source::Db => {
            let client = db::connect(&config.connection.env_var).await?;
            let state = confiture_schema::introspect(&client).await?;
            (format!("${{{}}}", config.connection.env_var), state)
        }
    }))
}

pub async fn run(
    config: &ConfitureConfig,
    from: Option<&str>,
    to: Option<&str>,
) -> Result<BuildResult, CliError> {
    let (description, state) = resolve(config, from, true).await?.expect("from always resolves");
    let fingerprint = state.fingerprint().to_string();

    let compared_to = match resolve(config, to, false).await? {
        Some((to_description, to_state)) => {
            let to_fingerprint = to_state.fingerprint().to_string();
            Some(ComparedTo {
                matches: to_fingerprint == fingerprint,
                source: to_description,
                fingerprint: to_fingerprint,
            })
        }
        None => None,
    };

    Ok(BuildResult {
        source: description,
        object_count: state.len(),
        fingerprint,
        compared_to,
    })
}
