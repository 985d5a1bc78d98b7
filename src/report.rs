//! Renders a [`RunReport`] to a terminal using `console` for coloring,
//! falling back to plain text when output isn't a tty.

use std::io::Write;

use console::style;
use console::Term;

use crate::runner::RunReport;
use crate::runner::TestOutcome;

/// Writes a human-readable summary of `report` to `term`, returning the
/// number of failed tests.
pub fn render(report: &RunReport, verbose: bool, term: &Term) -> std::io::Result<usize> {
    let mut failed = 0;
    for outcome in &report.outcomes {
        render_outcome(outcome, verbose, term)?;
        if !outcome.passed {
            failed += 1;
        }
    }
    writeln!(term)?;
    writeln!(
        term,
        "{} passed, {} failed",
        style(report.outcomes.len() - failed).green(),
        style(failed).red()
    )?;
    Ok(failed)
}

fn render_outcome(outcome: &TestOutcome, verbose: bool, term: &Term) -> std::io::Result<()> {
    if outcome.passed {
        writeln!(term, "{} {}", style("ok").green().bold(), outcome.name)?;
    } else {
        writeln!(term, "{} {}", style("FAIL").red().bold(), outcome.name)?;
        if let Some(detail) = &outcome.diagnostic {
            writeln!(term, "  {}", style(detail).dim())?;
        }
    }
    if verbose {
        for entry in &outcome.verbose_log {
            writeln!(term, "  line {}:", entry.source_line)?;
            if !entry.result.stdout.is_empty() {
                writeln!(term, "    stdout: {:?}", entry.result.stdout)?;
            }
            if !entry.result.stderr.is_empty() {
                writeln!(term, "    stderr: {:?}", entry.result.stderr)?;
            }
        }
    }
    Ok(())
}
