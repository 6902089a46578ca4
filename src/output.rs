use std::fs;
use std::io::{self, Write};

use camino::Utf8Path;
use serde::Serialize;
use tempfile::Builder;

use crate::error::InputsError;
use crate::inputs::InputConfiguration;

pub struct InputsWriter;

impl InputsWriter {
    /// Writes the document next to `path` first and persists it over any
    /// existing file, so readers never see a partial document.
    pub fn write(path: &Utf8Path, document: &InputConfiguration) -> Result<(), InputsError> {
        let value = document.to_json()?;
        let mut content = serde_json::to_vec_pretty(&value)
            .map_err(|err| InputsError::Filesystem(err.to_string()))?;
        content.push(b'\n');

        let parent = match path.parent() {
            Some(parent) if !parent.as_str().is_empty() => parent,
            _ => Utf8Path::new("."),
        };
        fs::create_dir_all(parent.as_std_path())
            .map_err(|err| InputsError::Filesystem(format!("create {parent}: {err}")))?;

        let mut temp = Builder::new()
            .prefix(".bgen-qc-inputs")
            .tempfile_in(parent.as_std_path())
            .map_err(|err| InputsError::Filesystem(format!("create temp file in {parent}: {err}")))?;
        temp.write_all(&content)
            .map_err(|err| InputsError::Filesystem(format!("write {path}: {err}")))?;
        temp.persist(path.as_std_path())
            .map_err(|err| InputsError::Filesystem(format!("write {path}: {}", err.error)))?;
        Ok(())
    }

    pub fn read(path: &Utf8Path, workflow: &str) -> Result<InputConfiguration, InputsError> {
        let content = fs::read_to_string(path.as_std_path())
            .map_err(|err| InputsError::Filesystem(format!("read {path}: {err}")))?;
        let value: serde_json::Value = serde_json::from_str(&content)
            .map_err(|err| InputsError::InvalidDocument(err.to_string()))?;
        InputConfiguration::from_json(workflow, &value)
    }
}

pub struct JsonOutput;

impl JsonOutput {
    pub fn print_document(document: &InputConfiguration) -> io::Result<()> {
        let value = document
            .to_json()
            .map_err(|err| io::Error::new(io::ErrorKind::InvalidData, err))?;
        Self::print_json(&value)
    }

    pub fn print_template(document: &InputConfiguration) -> io::Result<()> {
        Self::print_json(&document.describe())
    }

    pub fn print_json<T: Serialize>(value: &T) -> io::Result<()> {
        let json = serde_json::to_string_pretty(value)
            .map_err(|err| io::Error::new(io::ErrorKind::Other, err))?;
        let mut stdout = io::stdout();
        stdout.write_all(json.as_bytes())?;
        stdout.write_all(b"\n")?;
        Ok(())
    }
}
