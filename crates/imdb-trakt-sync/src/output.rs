use clap::ValueEnum;
use comfy_table::{Attribute, Cell, CellAlignment, Color, Table};
use owo_colors::OwoColorize;
use serde_json::json;
use trakt_sync_core::{DomainReport, SyncReport};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Human,
    Json,
    #[value(name = "json-pretty")]
    JsonPretty,
}

pub struct Output {
    format: OutputFormat,
    quiet: bool,
}

impl Output {
    pub fn new(format: OutputFormat, quiet: bool) -> Self {
        Self { format, quiet }
    }

    pub fn format(&self) -> OutputFormat {
        self.format
    }

    pub fn is_quiet(&self) -> bool {
        self.quiet
    }

    pub fn success(&self, msg: impl AsRef<str>) {
        if self.quiet {
            return;
        }

        match self.format {
            OutputFormat::Human => {
                println!("{} {}", "✓".green(), msg.as_ref());
            }
            OutputFormat::Json | OutputFormat::JsonPretty => {
                self.print_json(&json!({
                    "type": "success",
                    "message": msg.as_ref()
                }));
            }
        }
    }

    pub fn warn(&self, msg: impl AsRef<str>) {
        if self.quiet {
            return;
        }

        match self.format {
            OutputFormat::Human => {
                println!("{} {}", "⚠".yellow(), msg.as_ref());
            }
            OutputFormat::Json | OutputFormat::JsonPretty => {
                self.print_json(&json!({
                    "type": "warning",
                    "message": msg.as_ref()
                }));
            }
        }
    }

    pub fn println(&self, msg: impl AsRef<str>) {
        if self.quiet {
            return;
        }

        match self.format {
            OutputFormat::Human => {
                println!("{}", msg.as_ref());
            }
            OutputFormat::Json | OutputFormat::JsonPretty => {
                self.print_json(&json!({
                    "type": "info",
                    "message": msg.as_ref()
                }));
            }
        }
    }

    pub fn json(&self, data: &serde_json::Value) {
        if self.quiet && self.format != OutputFormat::Human {
            return;
        }

        self.print_json(data);
    }

    fn print_json(&self, data: &serde_json::Value) {
        match self.format {
            OutputFormat::Json => {
                println!("{}", serde_json::to_string(data).unwrap_or_default());
            }
            OutputFormat::JsonPretty => {
                println!("{}", serde_json::to_string_pretty(data).unwrap_or_default());
            }
            OutputFormat::Human => {
                println!("{}", data);
            }
        }
    }

    /// Final summary of a sync run: a table plus one status line, or the
    /// whole report as JSON
    pub fn sync_report(&self, report: &SyncReport) {
        match self.format {
            OutputFormat::Human => {
                if self.quiet {
                    return;
                }
                if report.domains.is_empty() {
                    self.warn("Nothing was synced");
                    return;
                }

                println!("{}", report_table(report));
                for domain in &report.domains {
                    for mutation in &domain.mutations {
                        for id in &mutation.not_found {
                            self.warn(format!("{}: Trakt could not find {}", mutation.mutation, id));
                        }
                    }
                }
                self.success(summary_line(report));
            }
            OutputFormat::Json | OutputFormat::JsonPretty => {
                let value = serde_json::to_value(report).unwrap_or_default();
                self.json(&json!({
                    "success": true,
                    "submitted": report.submitted(),
                    "applied": report.applied(),
                    "not_found": report.not_found(),
                    "report": value,
                }));
            }
        }
    }
}

fn number_cell(value: impl ToString) -> Cell {
    Cell::new(value.to_string()).set_alignment(CellAlignment::Right)
}

fn domain_row(domain: &DomainReport, dry_run: bool) -> Vec<Cell> {
    let applied = if dry_run {
        Cell::new("-").set_alignment(CellAlignment::Right)
    } else {
        number_cell(domain.applied())
    };

    vec![
        Cell::new(domain.domain.as_str()).add_attribute(Attribute::Bold),
        number_cell(domain.local),
        number_cell(domain.remote),
        number_cell(domain.unchanged),
        number_cell(domain.remote_only),
        number_cell(domain.excluded_watching),
        number_cell(domain.unknown),
        number_cell(domain.submitted()),
        applied,
    ]
}

pub fn report_table(report: &SyncReport) -> Table {
    let mut table = Table::new();
    table.load_preset(comfy_table::presets::UTF8_FULL);
    table.apply_modifier(comfy_table::modifiers::UTF8_ROUND_CORNERS);
    table.set_header(
        [
            "Domain",
            "IMDb",
            "Trakt",
            "Unchanged",
            "Trakt only",
            "Watching",
            "Unknown",
            "Submitted",
            "Applied",
        ]
        .into_iter()
        .map(|h| Cell::new(h).fg(Color::Cyan).add_attribute(Attribute::Bold)),
    );

    for domain in &report.domains {
        table.add_row(domain_row(domain, report.dry_run));
    }
    table
}

fn summary_line(report: &SyncReport) -> String {
    if report.dry_run {
        format!(
            "Dry run complete: {} changes would be sent to Trakt",
            report.submitted()
        )
    } else {
        let not_found = report.not_found();
        if not_found > 0 {
            format!(
                "Sync completed: {} of {} changes applied, {} not found on Trakt",
                report.applied(),
                report.submitted(),
                not_found
            )
        } else {
            format!("Sync completed: {} of {} changes applied", report.applied(), report.submitted())
        }
    }
}
