use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum InputsError {
    #[error("invalid file identifier: {0}")]
    InvalidFileId(String),

    #[error("invalid name pattern: {0}")]
    InvalidPattern(String),

    #[error("invalid setting `{field}`: {message}")]
    #[diagnostic(help("set it in the settings file or pass it on the command line"))]
    InvalidSetting { field: &'static str, message: String },

    #[error("failed to read settings file at {0}")]
    ConfigRead(PathBuf),

    #[error("failed to parse JSON settings: {0}")]
    ConfigParse(String),

    #[error("required tool not found: {0}")]
    #[diagnostic(help("install the DNAnexus dx-toolkit and make sure `dx` is on PATH"))]
    MissingTool(String),

    #[error("{query}: could not start catalog query: {message}")]
    QueryLaunch { query: String, message: String },

    #[error("{query}: catalog query exited with {status}: {message}")]
    QueryFailed {
        query: String,
        status: String,
        message: String,
    },

    #[error("{query}: catalog query timed out after {seconds}s")]
    QueryTimeout { query: String, seconds: u64 },

    #[error("{query}: malformed catalog output: {message}")]
    MalformedOutput { query: String, message: String },

    #[error("no {what} found under {path}")]
    #[diagnostic(help("check the data path and that you are logged into the platform"))]
    EmptyResultSet { what: String, path: String },

    #[error("no active platform session: {0}")]
    #[diagnostic(help("run `dx login` first"))]
    NotLoggedIn(String),

    #[error("input `{0}` was left unset")]
    UnsetInput(String),

    #[error("invalid inputs document: {0}")]
    InvalidDocument(String),

    #[error("filesystem error: {0}")]
    Filesystem(String),
}
