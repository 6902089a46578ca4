use serde::Serialize;
use tracing::{info, warn};

use crate::catalog::{CatalogClient, CatalogQuery};
use crate::config::Settings;
use crate::domain::{DxUri, NamePattern};
use crate::error::InputsError;
use crate::inputs::{InputConfiguration, InputKey, InputValue};
use crate::output::InputsWriter;

pub const BGEN_EXTENSION: &str = "bgen";
pub const SAMPLE_EXTENSION: &str = "sample";

#[derive(Debug, Clone, Serialize)]
pub struct GenerateResult {
    pub output: Option<String>,
    pub workflow: String,
    pub bgen_files: usize,
    pub sample_files: usize,
    pub keep_file: Option<String>,
}

#[derive(Clone)]
pub struct Assembler<C: CatalogClient> {
    catalog: C,
}

impl<C: CatalogClient> Assembler<C> {
    pub fn new(catalog: C) -> Self {
        Self { catalog }
    }

    pub fn catalog(&self) -> &C {
        &self.catalog
    }

    pub fn assemble(&self, settings: &Settings) -> Result<InputConfiguration, InputsError> {
        let bgens = self.find_required(
            "bgen files",
            NamePattern::extension(BGEN_EXTENSION),
            &settings.data_path,
        )?;
        let samples = self.find_required(
            "sample files",
            NamePattern::extension(SAMPLE_EXTENSION),
            &settings.sample_folder,
        )?;
        let keep_file = match &settings.phenotype {
            Some(lookup) => self.find_phenotype(&lookup.name, &lookup.folder)?,
            None => None,
        };

        let mut document = InputConfiguration::template(&settings.workflow);
        document.remove(InputKey::ExtractFiles);
        document.set(InputKey::RefFirst, InputValue::Flag(true))?;
        match keep_file {
            Some(uri) => document.set(InputKey::KeepFile, InputValue::file(uri))?,
            None => {
                document.remove(InputKey::KeepFile);
            }
        }
        document.set(
            InputKey::OutputPrefix,
            InputValue::Text(settings.output_prefix.clone()),
        )?;
        document.set(
            InputKey::Plink2Options,
            InputValue::Text(settings.plink2_options.clone()),
        )?;
        document.set(InputKey::GenoSampleFiles, InputValue::files(samples))?;
        document.set(InputKey::GenoBgenFiles, InputValue::files(bgens))?;

        Ok(document)
    }

    pub fn assemble_and_write(&self, settings: &Settings) -> Result<GenerateResult, InputsError> {
        let document = self.assemble(settings)?;
        InputsWriter::write(&settings.output, &document)?;
        info!(path = %settings.output, "wrote workflow inputs");
        let mut result = summarize(&document);
        result.output = Some(settings.output.to_string());
        Ok(result)
    }

    fn find_required(
        &self,
        what: &str,
        name: NamePattern,
        path: &str,
    ) -> Result<Vec<DxUri>, InputsError> {
        let query = CatalogQuery::new(what, name, path);
        info!(query = %query, "querying catalog");
        let ids = self.catalog.find(&query)?;
        if ids.is_empty() {
            return Err(InputsError::EmptyResultSet {
                what: what.to_string(),
                path: path.to_string(),
            });
        }
        info!(count = ids.len(), "found {what}");
        Ok(ids.iter().map(|id| id.to_uri()).collect())
    }

    fn find_phenotype(
        &self,
        name: &NamePattern,
        folder: &str,
    ) -> Result<Option<DxUri>, InputsError> {
        let query = CatalogQuery::new("phenotype file", name.clone(), folder);
        info!(query = %query, "querying catalog");
        let ids = self.catalog.find(&query)?;
        match ids.as_slice() {
            [] => {
                warn!(name = %name, folder, "phenotype file not found; keep_file left out");
                Ok(None)
            }
            [first, rest @ ..] => {
                if !rest.is_empty() {
                    warn!(
                        name = %name,
                        matches = ids.len(),
                        chosen = %first,
                        "several phenotype files match; using the first"
                    );
                }
                Ok(Some(first.to_uri()))
            }
        }
    }
}

pub fn summarize(document: &InputConfiguration) -> GenerateResult {
    let count = |key| match document.get(key) {
        Some(InputValue::Files(files)) => files.len(),
        _ => 0,
    };
    GenerateResult {
        output: None,
        workflow: document.workflow().to_string(),
        bgen_files: count(InputKey::GenoBgenFiles),
        sample_files: count(InputKey::GenoSampleFiles),
        keep_file: match document.get(InputKey::KeepFile) {
            Some(InputValue::Text(uri)) => Some(uri.clone()),
            _ => None,
        },
    }
}
