//! The structured output contract (spec §4.10). Every long-running
//! operation's result implements `Render` so the CLI's `--format` flag can
//! pick text, JSON, or CSV without each command hand-rolling three
//! renderings.

use serde::Serialize;
use std::io::Write;

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
    Csv,
}

/// A result type that can render itself in all three formats required by
/// spec §4.10. `to_text` is always available; `to_json` is derived from the
/// type's `Serialize` impl with a fixed `schema_version` envelope so CI/CD
/// consumers have a stable contract (SPEC_FULL §B.5); `csv_rows` is only
/// meaningful for tabular results and defaults to a single summary row.
pub trait Render: Serialize {
    /// Name of the JSON schema this result conforms to, e.g.
    /// `"confiture.migrate.status.v1"`.
    fn schema_name(&self) -> &'static str;

    fn to_text(&self) -> String;

    fn to_json(&self) -> serde_json::Result<String>
    where
        Self: Sized,
    {
        let envelope = JsonEnvelope {
            schema: self.schema_name(),
            schema_version: 1,
            data: self,
        };
        serde_json::to_string_pretty(&envelope)
    }

    /// Header row followed by data rows. The default produces a single
    /// `ok` row; tabular results (status, diff, lint findings) override
    /// this.
    fn csv_rows(&self) -> Vec<Vec<String>> {
        vec![vec!["result".to_string()], vec!["ok".to_string()]]
    }

    fn to_csv(&self) -> std::io::Result<String> {
        let mut buf = Vec::new();
        {
            let mut writer = csv::Writer::from_writer(&mut buf);
            for row in self.csv_rows() {
                writer
                    .write_record(&row)
                    .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?;
            }
            writer
                .flush()
                .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?;
        }
        String::from_utf8(buf)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
    }

    fn render(&self, format: OutputFormat, out: &mut dyn Write) -> std::io::Result<()>
    where
        Self: Sized,
    {
        match format {
            OutputFormat::Text => writeln!(out, "{}", self.to_text()),
            OutputFormat::Json => {
                let json = self
                    .to_json()
                    .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
                writeln!(out, "{}", json)
            }
            OutputFormat::Csv => {
                let csv = self.to_csv()?;
                write!(out, "{}", csv)
            }
        }
    }
}

#[derive(Serialize)]
struct JsonEnvelope<'a, T: Serialize> {
    schema: &'static str,
    schema_version: u32,
    data: &'a T,
}
