//! Output formatters

pub mod json;
pub mod terminal;

use crate::app::OutputFormat;
use smartlease_core::SearchReport;
use std::io::Write;
use termcolor::{BufferWriter, ColorChoice};

/// Print a search report to stdout
pub fn print_report(report: &SearchReport, format: OutputFormat) -> std::io::Result<()> {
    match format {
        OutputFormat::Json => {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(json::format_report(report).as_bytes())
        }
        OutputFormat::Cli => {
            let writer = BufferWriter::stdout(ColorChoice::Auto);
            let mut buffer = writer.buffer();
            terminal::write_report(&mut buffer, report)?;
            writer.print(&buffer)
        }
    }
}
