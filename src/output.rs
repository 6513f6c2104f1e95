use console::Style;
use serde::{Deserialize, Serialize};

use crate::mutants::{MutantId, MutantRunResult, MutantStatus};

#[derive(Debug, Serialize, Deserialize)]
pub struct RunSummary {
    /// Detected (killed + timed out) over valid (detected + survived +
    /// uncovered). Ignored and errored mutants count toward neither side.
    pub score: f64,
    pub total: usize,
    pub killed: usize,
    pub survived: usize,
    pub timeout: usize,
    pub no_coverage: usize,
    pub ignored: usize,
    pub error: usize,
    pub survived_mutants: Vec<MutantId>,
}

pub fn summarize(results: &[MutantRunResult]) -> RunSummary {
    let mut summary = RunSummary {
        score: 1.0,
        total: results.len(),
        killed: 0,
        survived: 0,
        timeout: 0,
        no_coverage: 0,
        ignored: 0,
        error: 0,
        survived_mutants: vec![],
    };
    for result in results {
        match &result.status {
            MutantStatus::Killed { .. } => summary.killed += 1,
            MutantStatus::Survived { .. } => {
                summary.survived += 1;
                summary.survived_mutants.push(result.id.clone());
            }
            MutantStatus::Timeout { .. } => summary.timeout += 1,
            MutantStatus::NoCoverage => {
                summary.no_coverage += 1;
                summary.survived_mutants.push(result.id.clone());
            }
            MutantStatus::Ignored { .. } => summary.ignored += 1,
            MutantStatus::Error { .. } => summary.error += 1,
        }
    }
    let detected = summary.killed + summary.timeout;
    let valid = detected + summary.survived + summary.no_coverage;
    if valid > 0 {
        summary.score = detected as f64 / valid as f64;
    }
    summary
}

pub fn print_error(msg: &str) {
    let style = Style::new().red().bold();
    eprintln!("{} {}", style.apply_to("✗"), msg);
}

pub fn print_success(msg: &str) {
    let style = Style::new().green().bold();
    println!("{} {}", style.apply_to("✓"), msg);
}

pub fn print_run_summary(summary: &RunSummary) {
    let score_pct = summary.score * 100.0;

    if summary.survived_mutants.is_empty() {
        let style = Style::new().green().bold();
        println!(
            "{} {} mutants, all detected ({:.1}%)",
            style.apply_to("✓"),
            summary.total,
            score_pct,
        );
    } else {
        let style = Style::new().yellow().bold();
        println!(
            "{} {} undetected / {} mutants ({:.1}% score)",
            style.apply_to("!"),
            summary.survived_mutants.len(),
            summary.total,
            score_pct,
        );
    }

    let dim = Style::new().dim();
    if summary.timeout > 0 {
        println!("  {} {} mutants timed out", dim.apply_to("·"), summary.timeout);
    }
    if summary.no_coverage > 0 {
        println!(
            "  {} {} mutants covered by no test",
            dim.apply_to("·"),
            summary.no_coverage
        );
    }
    if summary.ignored > 0 {
        println!("  {} {} mutants ignored", dim.apply_to("·"), summary.ignored);
    }
    if summary.error > 0 {
        println!(
            "  {} {} mutants could not be run",
            dim.apply_to("·"),
            summary.error
        );
    }

    if !summary.survived_mutants.is_empty() {
        println!();
        let ref_style = Style::new().cyan().bold();
        for id in &summary.survived_mutants {
            println!("  {} undetected", ref_style.apply_to(format!("@{id}")));
        }
    }
}
