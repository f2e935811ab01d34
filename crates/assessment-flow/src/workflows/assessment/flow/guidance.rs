use serde::{Deserialize, Serialize};

pub const DEFAULT_MIN_DONT_KNOW: usize = 3;
pub const DEFAULT_MIN_DONT_KNOW_PERCENT: u8 = 30;

/// Thresholds for the knowledge-gap nudge. Both must be reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuidancePolicy {
    pub min_dont_know: usize,
    pub min_percent: u8,
}

impl Default for GuidancePolicy {
    fn default() -> Self {
        Self {
            min_dont_know: DEFAULT_MIN_DONT_KNOW,
            min_percent: DEFAULT_MIN_DONT_KNOW_PERCENT,
        }
    }
}

impl GuidancePolicy {
    pub fn should_show_guidance(&self, dont_know_count: usize, total_questions: usize) -> bool {
        if total_questions == 0 || dont_know_count < self.min_dont_know {
            return false;
        }

        let percent = (dont_know_count as f64 / total_questions as f64 * 100.0).round();
        percent >= f64::from(self.min_percent)
    }
}

/// Default-policy shorthand.
pub fn should_show_guidance(dont_know_count: usize, total_questions: usize) -> bool {
    GuidancePolicy::default().should_show_guidance(dont_know_count, total_questions)
}
