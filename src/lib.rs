pub mod domain;
pub mod engine;
pub mod output;
pub mod parsing;
pub mod policy;
