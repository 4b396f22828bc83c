pub mod duration;
pub mod generator;
pub mod handlers;
pub mod json_parser;
pub mod models;
pub mod parser;
pub mod prompts;
pub mod validation;
