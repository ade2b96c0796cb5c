//! Terminal formatting for search results, listings and run summaries

use crate::matching::{MatchedField, Score};
use crate::search::{MatchResult, RunState, RunSummary};
use crate::tree::FolderNode;
use std::io::{self, Write};
use termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};

pub fn stdout(color: bool) -> StandardStream {
    let choice = if color {
        ColorChoice::Auto
    } else {
        ColorChoice::Never
    };
    StandardStream::stdout(choice)
}

/// Print one result: `path  [content] (d=1) (cached)`
pub fn print_match(out: &mut impl WriteColor, result: &MatchResult) -> io::Result<()> {
    let color = if result.is_dir {
        Color::Blue
    } else {
        Color::Magenta
    };
    out.set_color(ColorSpec::new().set_fg(Some(color)).set_bold(result.is_dir))?;
    write!(out, "{}", result.path.display())?;
    if result.is_dir {
        write!(out, "/")?;
    }
    out.reset()?;

    if result.field == MatchedField::Content {
        out.set_color(ColorSpec::new().set_fg(Some(Color::Cyan)))?;
        write!(out, "  [content]")?;
        out.reset()?;
    }

    match result.score {
        Score::Exact => {}
        Score::Distance(d) => {
            out.set_color(ColorSpec::new().set_fg(Some(Color::Green)))?;
            write!(out, "  (d={})", d)?;
            out.reset()?;
        }
        Score::Similarity(s) => {
            out.set_color(ColorSpec::new().set_fg(Some(Color::Green)))?;
            write!(out, "  (j={:.2})", s)?;
            out.reset()?;
        }
    }

    if result.cached {
        out.set_color(ColorSpec::new().set_dimmed(true))?;
        write!(out, "  (cached)")?;
        out.reset()?;
    }

    writeln!(out)
}

/// Print the children of a directory, folders first marked with `/`
pub fn print_listing(out: &mut impl WriteColor, nodes: &[FolderNode]) -> io::Result<()> {
    for node in nodes {
        if node.is_dir() {
            out.set_color(ColorSpec::new().set_fg(Some(Color::Blue)).set_bold(true))?;
            writeln!(out, "{}/", node.name)?;
            out.reset()?;
        } else {
            writeln!(out, "{}", node.name)?;
        }
    }
    Ok(())
}

/// Print the summary line to stderr so stdout stays pipeable
pub fn print_summary(summary: &RunSummary, color: bool) -> io::Result<()> {
    let choice = if color {
        ColorChoice::Auto
    } else {
        ColorChoice::Never
    };
    let mut err = StandardStream::stderr(choice);

    let (label, tint) = match summary.state {
        RunState::Completed if summary.partial_failure => ("completed with errors", Color::Yellow),
        RunState::Completed => ("completed", Color::Green),
        RunState::Cancelled => ("cancelled", Color::Yellow),
        RunState::Failed => ("failed", Color::Red),
        RunState::Idle | RunState::Running => ("unfinished", Color::Yellow),
    };
    err.set_color(ColorSpec::new().set_fg(Some(tint)).set_bold(true))?;
    write!(err, "{}", label)?;
    err.reset()?;
    writeln!(
        err,
        ": {} results in {} units, {} workers, {:.2?}",
        summary.results, summary.units, summary.workers, summary.elapsed
    )?;

    for failure in &summary.failures {
        err.set_color(ColorSpec::new().set_fg(Some(Color::Red)))?;
        write!(err, "  error")?;
        err.reset()?;
        writeln!(err, ": {}", failure.error)?;
    }
    if let Some(error) = &summary.error {
        writeln!(err, "  {}", error)?;
    }
    if let Some(path) = &summary.log_file {
        writeln!(err, "  log: {}", path.display())?;
    }
    Ok(())
}
