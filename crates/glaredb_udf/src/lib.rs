pub mod api;
pub mod arrays;
pub mod compat;
pub mod config;
pub mod evaluator;
pub mod functions;
pub mod partition;
pub mod validate;
