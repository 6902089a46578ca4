pub mod assemble;
pub mod catalog;
pub mod config;
pub mod domain;
pub mod error;
pub mod inputs;
pub mod output;
