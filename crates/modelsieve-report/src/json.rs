use serde::Serialize;

use modelsieve_core::pipeline::PassOutcome;
use modelsieve_core::types::WorkingSet;

/// Counts shown alongside the full outcome.
#[derive(Debug, Serialize)]
pub struct Summary {
    pub direct_units: usize,
    pub referenced_units: usize,
    pub models: usize,
}

/// Wrapper for classify output that adds summary counts.
#[derive(Debug, Serialize)]
pub struct OutcomeReport<'a> {
    #[serde(flatten)]
    pub outcome: &'a PassOutcome,
    pub summary: Summary,
}

fn to_json<T: Serialize>(value: &T, compact: bool) -> String {
    if compact {
        serde_json::to_string(value).expect("report should be serializable")
    } else {
        serde_json::to_string_pretty(value).expect("report should be serializable")
    }
}

/// Format a full classification pass as JSON.
pub fn format_outcome(outcome: &PassOutcome, compact: bool) -> String {
    let report = OutcomeReport {
        outcome,
        summary: Summary {
            direct_units: outcome.working_set.direct_units.len(),
            referenced_units: outcome.working_set.referenced_units.len(),
            models: outcome.models.len(),
        },
    };
    to_json(&report, compact)
}

/// Format a scan-only working set as JSON.
pub fn format_working_set(working_set: &WorkingSet, compact: bool) -> String {
    to_json(working_set, compact)
}

#[cfg(test)]
mod tests {
    use super::*;
    use modelsieve_core::classifier::Verdict;
    use modelsieve_core::types::TypeName;

    fn sample_outcome() -> PassOutcome {
        let mut working_set = WorkingSet::new();
        working_set.direct_units.insert(TypeName::new("app.Dog"));
        working_set.direct_units.insert(TypeName::new("app.Util"));
        working_set.referenced_units.insert(TypeName::new("lib.Base"));
        PassOutcome {
            working_set,
            verdicts: [
                (TypeName::new("app.Dog"), Verdict::Model),
                (TypeName::new("app.Util"), Verdict::NotAnnotated),
            ]
            .into_iter()
            .collect(),
            models: [TypeName::new("app.Dog")].into_iter().collect(),
        }
    }

    #[test]
    fn test_format_outcome_valid_json() {
        let json = format_outcome(&sample_outcome(), false);
        let parsed: serde_json::Value = serde_json::from_str(&json).expect("should be valid JSON");
        assert_eq!(parsed["models"], serde_json::json!(["app.Dog"]));
        assert_eq!(parsed["verdicts"]["app.Dog"], "model");
        assert_eq!(parsed["verdicts"]["app.Util"], "not-annotated");
        assert_eq!(parsed["summary"]["direct_units"], 2);
        assert_eq!(parsed["summary"]["referenced_units"], 1);
        assert_eq!(parsed["summary"]["models"], 1);
        assert_eq!(
            parsed["working_set"]["referenced_units"],
            serde_json::json!(["lib.Base"])
        );
    }

    #[test]
    fn test_format_outcome_compact_is_single_line() {
        let json = format_outcome(&sample_outcome(), true);
        assert!(!json.contains('\n'), "compact JSON should be single line");
        let _: serde_json::Value = serde_json::from_str(&json).expect("should be valid JSON");
    }

    #[test]
    fn test_format_working_set() {
        let json = format_working_set(&sample_outcome().working_set, false);
        assert!(json.contains('\n'), "pretty JSON should be multiline");
        let parsed: serde_json::Value = serde_json::from_str(&json).expect("should be valid JSON");
        assert_eq!(
            parsed["direct_units"],
            serde_json::json!(["app.Dog", "app.Util"])
        );
    }
}
