pub mod agent;
pub mod artifacts;
pub mod delegation;
pub mod errors;
pub mod models;
pub mod plan;
pub mod prompt_template;
pub mod providers;
pub mod router;
pub mod tools;
