//! The task plan produced once per run by the planning stage.
//!
//! The planning model either invokes the direct-answer sentinel tool or
//! returns a document matching this schema and nothing else — strict JSON
//! with no surrounding prose. The parsed plan is immutable for the rest of
//! the run.

use serde::{Deserialize, Serialize};

/// An ordered task decomposition for one agent run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Plan {
    pub steps: Vec<PlanStep>,
}

/// A single step in a plan.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PlanStep {
    /// Step number, starting at 1
    pub id: u32,

    /// What this step should achieve
    pub target: String,

    /// How to achieve it, in detail
    pub detail: String,
}

impl Plan {
    /// Parse a plan from the raw model output.
    ///
    /// The whole body must be a single JSON document; prose before or after
    /// the JSON, or unknown keys, fail the parse.
    pub fn parse(raw: &str) -> std::result::Result<Self, serde_json::Error> {
        serde_json::from_str(raw.trim())
    }

    /// Render the plan as a text block for injection into the decision
    /// instruction.
    pub fn render(&self) -> String {
        let mut out = String::new();
        for step in &self.steps {
            out.push_str(&format!("{}. {}: {}\n", step.id, step.target, step.detail));
        }
        out
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_valid_plan() {
        let raw = r#"{
            "steps": [
                {"id": 1, "target": "Find the data", "detail": "Query the orders table"},
                {"id": 2, "target": "Summarize", "detail": "Write a short report file"}
            ]
        }"#;
        let plan = Plan::parse(raw).unwrap();
        assert_eq!(plan.len(), 2);
        assert_eq!(plan.steps[0].id, 1);
        assert_eq!(plan.steps[1].target, "Summarize");
    }

    #[test]
    fn rejects_surrounding_prose() {
        let raw = r#"Here is the plan: {"steps": []}"#;
        assert!(Plan::parse(raw).is_err());
    }

    #[test]
    fn rejects_unknown_fields() {
        let raw = r#"{"steps": [], "note": "extra"}"#;
        assert!(Plan::parse(raw).is_err());

        let raw = r#"{"steps": [{"id": 1, "target": "t", "detail": "d", "why": "?"}]}"#;
        assert!(Plan::parse(raw).is_err());
    }

    #[test]
    fn rejects_non_integer_step_id() {
        let raw = r#"{"steps": [{"id": "one", "target": "t", "detail": "d"}]}"#;
        assert!(Plan::parse(raw).is_err());
    }

    #[test]
    fn tolerates_leading_whitespace() {
        let raw = "\n  {\"steps\": []}  \n";
        let plan = Plan::parse(raw).unwrap();
        assert!(plan.is_empty());
    }

    #[test]
    fn render_lists_steps_in_order() {
        let plan = Plan {
            steps: vec![
                PlanStep {
                    id: 1,
                    target: "Collect".into(),
                    detail: "Gather inputs".into(),
                },
                PlanStep {
                    id: 2,
                    target: "Report".into(),
                    detail: "Write the summary".into(),
                },
            ],
        };
        let text = plan.render();
        let collect_pos = text.find("Collect").unwrap();
        let report_pos = text.find("Report").unwrap();
        assert!(collect_pos < report_pos);
    }
}
