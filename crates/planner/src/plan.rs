//! Helpers for the milestone checklist inside the plan artifact.
//!
//! Milestones are written as ` - [ ] N. <description>` and flipped to ` - [x]` once done.
use lazy_static::lazy_static;
use regex::Regex;

/// Name of the artifact the planning prompt asks the model to save
pub const PLAN_ARTIFACT: &str = "plan.md";

const OPEN_MARKER: &str = "- [ ]";
const DONE_MARKER: &str = "- [x]";

lazy_static! {
    static ref MILESTONE_LINE: Regex =
        Regex::new(r"^- \[(?P<mark>[ xX])\]\s*(?:(?P<number>\d+)\.\s*)?(?P<description>.*)$")
            .unwrap();
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Milestone {
    /// The trimmed checklist line as it appears in the plan
    pub line: String,
    pub number: Option<u32>,
    pub description: String,
    pub completed: bool,
}

/// All checklist entries of the plan, in document order
pub fn parse_milestones(plan: &str) -> Vec<Milestone> {
    plan.lines()
        .filter_map(|line| {
            let trimmed = line.trim();
            let captures = MILESTONE_LINE.captures(trimmed)?;
            Some(Milestone {
                line: trimmed.to_string(),
                number: captures
                    .name("number")
                    .and_then(|n| n.as_str().parse().ok()),
                description: captures["description"].trim().to_string(),
                completed: !captures["mark"].trim().is_empty(),
            })
        })
        .collect()
}

/// The first milestone that has not been checked off yet
pub fn next_open_milestone(plan: &str) -> Option<Milestone> {
    parse_milestones(plan).into_iter().find(|m| !m.completed)
}

/// Check off the given milestone line, leaving every other line untouched
pub fn mark_completed(plan: &str, milestone_line: &str) -> String {
    let target = milestone_line.trim();
    let mut updated: Vec<String> = Vec::new();
    for line in plan.split('\n') {
        if line.trim() == target && target.starts_with(OPEN_MARKER) {
            updated.push(line.replacen(OPEN_MARKER, DONE_MARKER, 1));
        } else {
            updated.push(line.to_string());
        }
    }
    updated.join("\n")
}
