use tfscope_types::Section;

use crate::patterns::{PatternError, PatternSet};

/// Transition markers, checked in this precedence
static SECTION_MARKERS: PatternSet = PatternSet::new(&[
    (
        "plan_start",
        r"(?i)\bstart(?:ing)?\s+plan\b|terraform will perform the following actions|terraform plan",
    ),
    (
        "apply_start",
        r"(?i)\bstart(?:ing)?\s+apply\b|applying\.\.\.|terraform apply",
    ),
    ("section_end", r"Apply complete!|Plan:|complete!"),
]);

/// Sticky plan/apply/other state for one batch
///
/// A line that triggers a transition is itself tagged with the new section.
#[derive(Clone, Debug, Default)]
pub struct SectionTracker {
    current: Section,
}

impl SectionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> Section {
        self.current
    }

    /// Apply the transition for `text` and return the section for this line
    pub fn advance(&mut self, text: &str) -> Result<Section, PatternError> {
        if SECTION_MARKERS.get_by_name("plan_start")?.is_match(text) {
            self.current = Section::Plan;
        } else if SECTION_MARKERS.get_by_name("apply_start")?.is_match(text) {
            self.current = Section::Apply;
        } else if SECTION_MARKERS.get_by_name("section_end")?.is_match(text) {
            self.current = Section::Other;
        }

        Ok(self.current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(lines: &[&str]) -> Vec<Section> {
        let mut tracker = SectionTracker::new();
        lines.iter().map(|l| tracker.advance(l).unwrap()).collect()
    }

    #[test]
    fn test_plan_then_complete() {
        assert_eq!(
            run(&["start plan marker", "normal line", "Apply complete!"]),
            vec![Section::Plan, Section::Plan, Section::Other]
        );
    }

    #[test]
    fn test_terraform_markers() {
        assert_eq!(
            run(&[
                "backend/local: starting Plan operation",
                "Terraform will perform the following actions:",
                "Plan: 2 to add, 0 to change, 0 to destroy.",
                "backend/local: starting Apply operation",
                "aws_instance.web: Creating...",
                "Apply complete! Resources: 2 added",
                "trailing output",
            ]),
            vec![
                Section::Plan,
                Section::Plan,
                Section::Other,
                Section::Apply,
                Section::Apply,
                Section::Other,
                Section::Other,
            ]
        );
    }

    #[test]
    fn test_initial_state_is_other() {
        let tracker = SectionTracker::new();
        assert_eq!(tracker.current(), Section::Other);
        assert_eq!(run(&["hello", ""]), vec![Section::Other, Section::Other]);
    }

    #[test]
    fn test_plan_start_outranks_end_marker() {
        assert_eq!(run(&["terraform plan complete!"]), vec![Section::Plan]);
    }
}
