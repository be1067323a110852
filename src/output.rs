//! Rendering of site lists as table, csv, json or bare urls.

use crate::{errors::AppError, models::site::Site};
use clap::ValueEnum;
use regex::Regex;
use serde_json::{Map, Value};
use std::sync::LazyLock;

/// Columns shown by `site list` when `--fields` is not given.
pub const DEFAULT_FIELDS: [&str; 4] = ["blog_id", "url", "last_updated", "registered"];

/// Every column `site list` knows about.
pub const AVAILABLE_FIELDS: [&str; 10] = [
    "blog_id",
    "network_id",
    "site_id",
    "domain",
    "path",
    "url",
    "registered",
    "last_updated",
    "public",
    "deleted",
];

const DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

static FIELD_SEPARATOR: LazyLock<Regex> = LazyLock::new(|| Regex::new(r",[ \t]*").unwrap());

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Table,
    Csv,
    Json,
    Url,
}

/// Split a `--fields` value on commas, tolerating spaces after them.
pub fn parse_fields(raw: &str) -> Vec<String> {
    FIELD_SEPARATOR
        .split(raw.trim())
        .filter(|f| !f.is_empty())
        .map(str::to_string)
        .collect()
}

fn field_value(site: &Site, field: &str) -> Option<Value> {
    let value = match field {
        "blog_id" => Value::from(site.blog_id),
        "network_id" | "site_id" => Value::from(site.network_id),
        "domain" => Value::from(site.domain.clone()),
        "path" => Value::from(site.path.clone()),
        "url" => Value::from(site.url()),
        "registered" => Value::from(site.registered.format(DATE_FORMAT).to_string()),
        "last_updated" => Value::from(site.last_updated.format(DATE_FORMAT).to_string()),
        "public" => Value::from(u8::from(site.public)),
        "deleted" => Value::from(u8::from(site.deleted)),
        _ => return None,
    };
    Some(value)
}

fn display(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Render `sites` with the selected columns.
pub fn render_sites(sites: &[Site], fields: &[String], format: OutputFormat) -> Result<String, AppError> {
    if let Some(unknown) = fields.iter().find(|f| !AVAILABLE_FIELDS.contains(&f.as_str())) {
        return Err(AppError::precondition(format!(
            "Invalid field: {}. Available fields: {}",
            unknown,
            AVAILABLE_FIELDS.join(", ")
        )));
    }

    let rows: Vec<Vec<Value>> = sites
        .iter()
        .map(|site| {
            fields
                .iter()
                .filter_map(|f| field_value(site, f))
                .collect()
        })
        .collect();

    match format {
        OutputFormat::Table => Ok(render_table(fields, &rows)),
        OutputFormat::Csv => render_csv(fields, &rows),
        OutputFormat::Json => {
            let items: Vec<Value> = rows
                .into_iter()
                .map(|row| {
                    let object: Map<String, Value> = fields.iter().cloned().zip(row).collect();
                    Value::Object(object)
                })
                .collect();
            let mut out = serde_json::to_string(&items)
                .map_err(|err| AppError::internal(err.to_string()))?;
            out.push('\n');
            Ok(out)
        }
        OutputFormat::Url => Ok(sites
            .iter()
            .map(|site| format!("{}\n", site.site_url()))
            .collect()),
    }
}

fn render_table(fields: &[String], rows: &[Vec<Value>]) -> String {
    let cells: Vec<Vec<String>> = rows
        .iter()
        .map(|row| row.iter().map(display).collect())
        .collect();
    let widths: Vec<usize> = fields
        .iter()
        .enumerate()
        .map(|(i, field)| {
            cells
                .iter()
                .map(|row| row[i].chars().count())
                .chain(std::iter::once(field.chars().count()))
                .max()
                .unwrap_or(0)
        })
        .collect();

    let border: String = widths
        .iter()
        .map(|w| format!("+{}", "-".repeat(w + 2)))
        .collect::<String>()
        + "+\n";

    let mut out = String::new();
    out.push_str(&border);
    out.push_str(&table_line(fields, &widths));
    out.push_str(&border);
    for row in &cells {
        out.push_str(&table_line(row, &widths));
    }
    out.push_str(&border);
    out
}

fn table_line(values: &[String], widths: &[usize]) -> String {
    values
        .iter()
        .zip(widths)
        .map(|(v, w)| format!("| {:<width$} ", v, width = w))
        .collect::<String>()
        + "|\n"
}

fn write_csv(
    writer: &mut csv::Writer<Vec<u8>>,
    fields: &[String],
    rows: &[Vec<Value>],
) -> Result<(), csv::Error> {
    writer.write_record(fields)?;
    for row in rows {
        writer.write_record(row.iter().map(display))?;
    }
    writer.flush()?;
    Ok(())
}

fn render_csv(fields: &[String], rows: &[Vec<Value>]) -> Result<String, AppError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    write_csv(&mut writer, fields, rows).map_err(|err| AppError::internal(err.to_string()))?;
    let bytes = writer
        .into_inner()
        .map_err(|err| AppError::internal(err.to_string()))?;
    String::from_utf8(bytes).map_err(|err| AppError::internal(err.to_string()))
}
