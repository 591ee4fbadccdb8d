//! Keyframe-aligned split planning and script rendering

pub mod keyframes;
pub mod script;
pub mod splitter;

pub use keyframes::{Direction, FramePair, KeyframeIndex, KeyframeQuery};
pub use script::{ScriptProfile, ScriptWriter};
pub use splitter::{PlanItem, PlanWarning, SplitPlan, SplitPlanner};
