use colored::Colorize;

use modelsieve_core::classifier::Verdict;
use modelsieve_core::pipeline::PassOutcome;
use modelsieve_core::types::{TypeName, WorkingSet};

fn header(title: &str) -> String {
    format!("\n{}\n{}\n\n", title.bold(), "=".repeat(40))
}

fn push_names<'a>(out: &mut String, names: impl Iterator<Item = &'a TypeName>) {
    for name in names {
        out.push_str(&format!("    {name}\n"));
    }
}

/// Format the working set of a scan for terminal output.
pub fn format_working_set(working_set: &WorkingSet) -> String {
    let mut out = header("modelsieve - Change Set");
    out.push_str(&format!(
        "{}: {} direct, {} referenced\n",
        "Summary".bold(),
        working_set.direct_units.len(),
        working_set.referenced_units.len(),
    ));

    if !working_set.direct_units.is_empty() {
        out.push_str(&format!("\n{}\n", "Direct units".bold()));
        push_names(&mut out, working_set.direct_units.iter());
    }
    if !working_set.referenced_units.is_empty() {
        out.push_str(&format!("\n{}\n", "Referenced units".bold()));
        push_names(&mut out, working_set.referenced_units.iter());
    }

    out.push('\n');
    out
}

/// Format a full classification pass for terminal output.
pub fn format_outcome(outcome: &PassOutcome) -> String {
    let mut out = header("modelsieve - Incremental Classification");
    out.push_str(&format!(
        "{}: {} direct, {} referenced, {} model type(s)\n",
        "Summary".bold(),
        outcome.working_set.direct_units.len(),
        outcome.working_set.referenced_units.len(),
        outcome.models.len(),
    ));

    if outcome.models.is_empty() {
        out.push_str(&format!("\n{}\n", "No model types in this change set.".yellow()));
    } else {
        out.push_str(&format!("\n{}\n{}\n", "Model types".green().bold(), "-".repeat(40)));
        push_names(&mut out, outcome.models.iter());
    }

    let excluded: Vec<_> = outcome
        .verdicts
        .iter()
        .filter(|(_, v)| matches!(v, Verdict::GeneratedProxy | Verdict::SentinelBase))
        .collect();
    if !excluded.is_empty() {
        out.push_str(&format!("\n{}\n{}\n", "Excluded".yellow().bold(), "-".repeat(40)));
        for (name, verdict) in excluded {
            out.push_str(&format!("    {name} ({verdict})\n"));
        }
    }

    let unresolved = outcome
        .verdicts
        .values()
        .filter(|v| matches!(v, Verdict::UnresolvedSuperclass))
        .count();
    if unresolved > 0 {
        out.push_str(&format!(
            "\n{} {unresolved} type(s) have a superclass outside the classpath\n",
            "Note:".cyan(),
        ));
    }

    out.push('\n');
    out
}
