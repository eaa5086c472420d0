pub mod status;
pub mod step_model;
