// Domain layer - Entry model and naming rules

pub mod model;
pub mod rules;
