//! Terminal output formatter

use smartlease_core::{
    CandidateResult, ExtractedMetadata, RerankOutcome, RetrievalPath, SearchReport,
};
use std::io::{self, Write};
use termcolor::{Color, ColorSpec, WriteColor};

pub fn write_report<W: WriteColor>(out: &mut W, report: &SearchReport) -> io::Result<()> {
    heading(out, "Filter")?;
    if report.predicate.is_empty() {
        writeln!(out, "  none")?;
    } else {
        writeln!(out, "  {}", report.predicate)?;
    }
    if let ExtractedMetadata::Unparsed { ref error, .. } = report.metadata {
        writeln!(out, "  (metadata not extracted: {})", error)?;
    }
    writeln!(out)?;

    match report.outcome {
        None => write_candidates(out, &report.candidates),
        Some(RerankOutcome::Ranked {
            ref ranked_properties,
        }) => {
            heading(out, "Recommendations")?;
            if ranked_properties.is_empty() {
                writeln!(out, "  No matching properties")?;
            }
            for (i, ranked) in ranked_properties.iter().enumerate() {
                let address = report
                    .candidates
                    .iter()
                    .find(|c| c.record.property_id == ranked.property_id)
                    .map(|c| c.record.get("address"))
                    .unwrap_or("");
                out.set_color(ColorSpec::new().set_bold(true))?;
                write!(out, "{:>3}. {}", i + 1, ranked.property_id)?;
                out.reset()?;
                writeln!(out, "  {}", address)?;

                for pro in &ranked.pros {
                    bullet(out, "+", Color::Green, pro)?;
                }
                for con in &ranked.cons {
                    bullet(out, "-", Color::Red, con)?;
                }
                if !ranked.suggestion.is_empty() {
                    bullet(out, ">", Color::Cyan, &ranked.suggestion)?;
                }
            }
            Ok(())
        }
        Some(RerankOutcome::Failed {
            ref error,
            ref raw_response,
        }) => {
            out.set_color(ColorSpec::new().set_fg(Some(Color::Yellow)))?;
            writeln!(out, "Re-ranking failed: {}", error)?;
            out.reset()?;
            writeln!(out, "{}", raw_response)
        }
    }
}

fn write_candidates<W: WriteColor>(out: &mut W, candidates: &[CandidateResult]) -> io::Result<()> {
    heading(out, "Candidates")?;
    if candidates.is_empty() {
        writeln!(out, "  No matching properties")?;
    }
    for (i, c) in candidates.iter().enumerate() {
        let tag = match c.source {
            RetrievalPath::Filtered => "filtered",
            RetrievalPath::Semantic => "semantic",
        };
        writeln!(
            out,
            "{:>3}. {:.4} [{}] {}  {}  {}",
            i + 1,
            c.final_score,
            tag,
            c.record.property_id,
            c.record.get("address"),
            c.record.get("list_price"),
        )?;
    }
    Ok(())
}

fn heading<W: WriteColor>(out: &mut W, title: &str) -> io::Result<()> {
    out.set_color(ColorSpec::new().set_bold(true).set_underline(true))?;
    write!(out, "{}", title)?;
    out.reset()?;
    writeln!(out)
}

fn bullet<W: WriteColor>(out: &mut W, mark: &str, color: Color, text: &str) -> io::Result<()> {
    out.set_color(ColorSpec::new().set_fg(Some(color)))?;
    write!(out, "     {}", mark)?;
    out.reset()?;
    writeln!(out, " {}", text)
}
