pub mod handle;
pub mod panic;
pub mod step_context;
pub mod tree;
pub mod wait_group;
