//! sheetwise CLI - schema-driven spreadsheet templates, exports and imports

mod logging;

use std::io::{self, IsTerminal};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use sheetwise::prelude::*;
use sheetwise::{
    build_workbook, dataset_from_json, error_file_name, SchemaDefinition, XlsxReader, XlsxWriter,
};
use tracing::{debug, info};

use crate::logging::{init_logging, LogConfig};

#[derive(Parser)]
#[command(name = "sheetwise")]
#[command(
    author,
    version,
    about = "Export records to spreadsheets and import them back with validation"
)]
struct Cli {
    /// More log output (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Only log errors
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write an empty workbook with the header row of every sheet
    Template {
        #[command(flatten)]
        layout: Layout,

        /// Output XLSX file
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Write rows from a JSON data file into a workbook
    Export {
        #[command(flatten)]
        layout: Layout,

        /// JSON object mapping sheet names to arrays of rows
        #[arg(short, long)]
        data: PathBuf,

        /// Output XLSX file
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Validate a workbook and write an error report for rejected rows
    Import {
        #[command(flatten)]
        layout: Layout,

        /// Input XLSX file
        input: PathBuf,

        /// Error report path (default: error-<input> next to the input)
        #[arg(short, long)]
        error_report: Option<PathBuf>,

        /// Print the valid rows as JSON on stdout
        #[arg(long)]
        json: bool,
    },
}

/// Options shared by every command
#[derive(Args)]
struct Layout {
    /// JSON schema definition
    #[arg(short, long)]
    schema: PathBuf,

    /// Row holding the column headers (0-based)
    #[arg(long, default_value = "0")]
    header_row: u32,

    /// Author written on header notes and error comments
    #[arg(long)]
    comment_author: Option<String>,

    /// Default strftime pattern for date columns
    #[arg(long)]
    date_format: Option<String>,
}

impl Layout {
    fn definition(&self) -> Result<SchemaDefinition> {
        SchemaDefinition::from_path(&self.schema)
            .with_context(|| format!("Failed to load schema '{}'", self.schema.display()))
    }

    fn options(&self) -> EngineOptions {
        let mut options = EngineOptions::default().with_header_row(self.header_row);
        if let Some(author) = &self.comment_author {
            options = options.with_comment_author(author.as_str());
        }
        if let Some(pattern) = &self.date_format {
            options = options.with_date_format(pattern.as_str());
        }
        options
    }
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_logging(
        &LogConfig::from_verbosity(cli.verbose, cli.quiet).with_ansi(io::stderr().is_terminal()),
    );

    match cli.command {
        Commands::Template { layout, output } => {
            template(&layout, &output)?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Export {
            layout,
            data,
            output,
        } => {
            export(&layout, &data, &output)?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Import {
            layout,
            input,
            error_report,
            json,
        } => import(&layout, &input, error_report.as_deref(), json),
    }
}

fn template(layout: &Layout, output: &Path) -> Result<()> {
    let schemas = layout.definition()?.schemas()?;
    let empty: Vec<DynamicRecord> = Vec::new();
    let sheets: Vec<SheetData<'_>> = schemas
        .iter()
        .map(|schema| SheetData::with_schema(schema, &empty))
        .collect();

    let workbook = build_workbook(&sheets, layout.options())?;
    XlsxWriter::write_file(&workbook, output)
        .with_context(|| format!("Failed to write '{}'", output.display()))?;
    eprintln!("Wrote template with {} sheet(s) to '{}'", schemas.len(), output.display());
    Ok(())
}

fn export(layout: &Layout, data: &Path, output: &Path) -> Result<()> {
    let options = layout.options();
    let schemas = layout.definition()?.schemas()?;

    let text = std::fs::read_to_string(data)
        .with_context(|| format!("Failed to read '{}'", data.display()))?;
    let document: serde_json::Value = serde_json::from_str(&text)
        .with_context(|| format!("'{}' is not valid JSON", data.display()))?;
    let rows = dataset_from_json(&schemas, &document, &options)
        .with_context(|| format!("Failed to convert rows of '{}'", data.display()))?;

    let sheets: Vec<SheetData<'_>> = schemas
        .iter()
        .zip(&rows)
        .map(|(schema, records)| SheetData::with_schema(schema, records))
        .collect();
    let workbook = build_workbook(&sheets, options)?;
    XlsxWriter::write_file(&workbook, output)
        .with_context(|| format!("Failed to write '{}'", output.display()))?;

    let total: usize = rows.iter().map(Vec::len).sum();
    eprintln!("Wrote {} row(s) to '{}'", total, output.display());
    Ok(())
}

fn import(layout: &Layout, input: &Path, error_report: Option<&Path>, json: bool) -> Result<ExitCode> {
    let definition = layout.definition()?;
    let mut registry = HandlerRegistry::new();
    let sheets = definition.register_all(&mut registry)?;
    debug!("registered {} sheet(s)", registry.len());

    let workbook = XlsxReader::read_file(input)
        .with_context(|| format!("Failed to open '{}'", input.display()))?;
    let outcome = Importer::new(&registry)
        .with_options(layout.options())
        .import(&workbook, &sheets)
        .with_context(|| format!("Failed to import '{}'", input.display()))?;

    print_summary(&outcome.result);
    if json {
        print_valid_rows(&outcome.result)?;
    }

    let Some(report) = outcome.error_report else {
        info!("all rows of '{}' are valid", input.display());
        return Ok(ExitCode::SUCCESS);
    };

    let path = error_report
        .map(Path::to_path_buf)
        .unwrap_or_else(|| default_error_path(input));
    report
        .save(&path)
        .with_context(|| format!("Failed to write error report '{}'", path.display()))?;
    eprintln!(
        "{} invalid row(s); error report written to '{}'",
        outcome.result.invalid_count(),
        path.display()
    );
    Ok(ExitCode::from(2))
}

/// `error-<name>` in the directory of the input
fn default_error_path(input: &Path) -> PathBuf {
    let name = input.to_string_lossy();
    input.with_file_name(error_file_name(&name))
}

fn print_summary(result: &ImportResult) {
    println!("{:<24} {:>8} {:>8}", "SHEET", "VALID", "INVALID");
    for sheet in result.sheets() {
        println!(
            "{:<24} {:>8} {:>8}",
            sheet.sheet().name,
            sheet.valid_count(),
            sheet.invalid_count()
        );
    }
    if !result.accepted() {
        println!("import rejected");
    }
}

fn print_valid_rows(result: &ImportResult) -> Result<()> {
    let mut document = serde_json::Map::new();
    for sheet in result.sheets() {
        let rows: Vec<serde_json::Value> = sheet
            .valid::<DynamicRecord>()
            .unwrap_or_default()
            .iter()
            .map(record_json)
            .collect();
        document.insert(sheet.sheet().name.clone(), serde_json::Value::Array(rows));
    }
    println!("{}", serde_json::to_string_pretty(&document)?);
    Ok(())
}

fn record_json(record: &DynamicRecord) -> serde_json::Value {
    let object = record
        .iter()
        .map(|(field, value)| (field.to_string(), field_json(value)))
        .collect();
    serde_json::Value::Object(object)
}

fn field_json(value: &FieldValue) -> serde_json::Value {
    use serde_json::Value;
    match value {
        FieldValue::Empty => Value::Null,
        FieldValue::Integer(i) => Value::from(*i),
        FieldValue::Number(n) => Value::from(*n),
        FieldValue::Boolean(b) => Value::Bool(*b),
        other => Value::String(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_default_error_path() {
        assert_eq!(
            default_error_path(Path::new("uploads/staff.xlsx")),
            PathBuf::from("uploads/error-staff.xlsx")
        );
        assert_eq!(default_error_path(Path::new("staff.xlsx")), PathBuf::from("error-staff.xlsx"));
    }

    #[test]
    fn test_field_json() {
        assert_eq!(field_json(&FieldValue::Empty), serde_json::Value::Null);
        assert_eq!(field_json(&FieldValue::Integer(3)), serde_json::json!(3));
        assert_eq!(field_json(&FieldValue::Code("2".into())), serde_json::json!("2"));
    }
}
