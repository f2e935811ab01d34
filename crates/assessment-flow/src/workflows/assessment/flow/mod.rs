//! Pure flow rules: visibility, completion, progress, navigation and the
//! knowledge-gap signal. Nothing here touches storage.

mod completion;
mod dependency;
mod guidance;
mod navigator;
mod progress;
mod state;

pub use completion::{is_complete, missing_answers};
pub use dependency::{dependencies_met, is_satisfied, visible_questions};
pub use guidance::{
    should_show_guidance, GuidancePolicy, DEFAULT_MIN_DONT_KNOW, DEFAULT_MIN_DONT_KNOW_PERCENT,
};
pub use navigator::{FlowNavigator, NextStep};
pub use progress::{progress, step, StepPosition};
pub use state::FlowState;
