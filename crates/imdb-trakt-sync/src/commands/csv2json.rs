use crate::output::{Output, OutputFormat};
use color_eyre::eyre::WrapErr;
use color_eyre::Result;
use serde_json::Value;
use std::fs::File;
use std::io::{self, Read, Write};
use std::path::Path;
use trakt_sync_sources::imdb::csv_to_json;

fn render(table: &Value, format: OutputFormat) -> Result<String> {
    let text = match format {
        OutputFormat::JsonPretty => serde_json::to_string_pretty(table)?,
        OutputFormat::Human | OutputFormat::Json => serde_json::to_string(table)?,
    };
    Ok(text)
}

fn convert<R: Read>(input: R, format: OutputFormat) -> Result<String> {
    let table = csv_to_json(input).map_err(|e| color_eyre::eyre::eyre!("Invalid CSV input: {}", e))?;
    render(&table, format)
}

/// The JSON document goes to stdout even in quiet mode: it is the command's result.
pub fn run_csv2json(input: Option<&Path>, output: &Output) -> Result<()> {
    let text = match input {
        Some(path) => {
            let file = File::open(path).wrap_err_with(|| format!("Failed to open {}", path.display()))?;
            convert(file, output.format())?
        }
        None => convert(io::stdin().lock(), output.format())?,
    };

    let mut stdout = io::stdout().lock();
    writeln!(stdout, "{}", text)?;
    stdout.flush()?;
    Ok(())
}
