use std::fs;
use std::time::Duration;

use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};

use crate::domain::NamePattern;
use crate::error::InputsError;
use crate::inputs::DEFAULT_WORKFLOW;

pub const DEFAULT_SETTINGS_FILE: &str = "bgen-qc.json";
pub const DEFAULT_OUTPUT_FILE: &str = "bgens_qc_input.json";
pub const DEFAULT_PHENOTYPE_FOLDER: &str = "/";

/// On-disk settings. Every field may also come from the command line.
#[derive(Debug, Default, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SettingsFile {
    #[serde(default)]
    pub data_path: Option<String>,
    #[serde(default)]
    pub sample_folder: Option<String>,
    #[serde(default)]
    pub phenotype_folder: Option<String>,
    #[serde(default)]
    pub phenotype_file: Option<String>,
    #[serde(default)]
    pub output_prefix: Option<String>,
    #[serde(default)]
    pub plink2_options: Option<String>,
    #[serde(default)]
    pub workflow: Option<String>,
    #[serde(default)]
    pub output: Option<String>,
    #[serde(default)]
    pub query_timeout_secs: Option<u64>,
}

impl SettingsFile {
    /// Fields set in `other` win.
    pub fn merge(self, other: SettingsFile) -> SettingsFile {
        SettingsFile {
            data_path: other.data_path.or(self.data_path),
            sample_folder: other.sample_folder.or(self.sample_folder),
            phenotype_folder: other.phenotype_folder.or(self.phenotype_folder),
            phenotype_file: other.phenotype_file.or(self.phenotype_file),
            output_prefix: other.output_prefix.or(self.output_prefix),
            plink2_options: other.plink2_options.or(self.plink2_options),
            workflow: other.workflow.or(self.workflow),
            output: other.output.or(self.output),
            query_timeout_secs: other.query_timeout_secs.or(self.query_timeout_secs),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhenotypeLookup {
    pub folder: String,
    pub name: NamePattern,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub data_path: String,
    pub sample_folder: String,
    pub phenotype: Option<PhenotypeLookup>,
    pub output_prefix: String,
    pub plink2_options: String,
    pub workflow: String,
    pub output: Utf8PathBuf,
    pub query_timeout: Option<Duration>,
}

pub struct SettingsLoader;

impl SettingsLoader {
    /// Reads the settings file (the default one only if present) and
    /// applies `overrides` on top.
    pub fn resolve(
        path: Option<&Utf8Path>,
        overrides: SettingsFile,
    ) -> Result<Settings, InputsError> {
        let file = match path {
            Some(path) => Self::read(path)?,
            None => {
                let default_path = Utf8Path::new(DEFAULT_SETTINGS_FILE);
                if default_path.as_std_path().exists() {
                    Self::read(default_path)?
                } else {
                    SettingsFile::default()
                }
            }
        };
        Self::resolve_settings(file.merge(overrides))
    }

    pub fn read(path: &Utf8Path) -> Result<SettingsFile, InputsError> {
        let content = fs::read_to_string(path.as_std_path())
            .map_err(|_| InputsError::ConfigRead(path.as_std_path().to_path_buf()))?;
        serde_json::from_str(&content).map_err(|err| InputsError::ConfigParse(err.to_string()))
    }

    pub fn resolve_settings(file: SettingsFile) -> Result<Settings, InputsError> {
        let data_path = required(file.data_path, "data_path")?;
        let output_prefix = required(file.output_prefix, "output_prefix")?;
        let sample_folder = non_blank(file.sample_folder).unwrap_or_else(|| data_path.clone());

        let phenotype = match non_blank(file.phenotype_file) {
            Some(name) => Some(PhenotypeLookup {
                folder: non_blank(file.phenotype_folder)
                    .unwrap_or_else(|| DEFAULT_PHENOTYPE_FOLDER.to_string()),
                name: name.parse().map_err(|_| InputsError::InvalidSetting {
                    field: "phenotype_file",
                    message: format!("not a file name: {name}"),
                })?,
            }),
            None => None,
        };

        let workflow = non_blank(file.workflow).unwrap_or_else(|| DEFAULT_WORKFLOW.to_string());
        if workflow.contains(|ch: char| ch.is_whitespace() || ch == '.') {
            return Err(InputsError::InvalidSetting {
                field: "workflow",
                message: format!("not a workflow name: {workflow}"),
            });
        }

        let query_timeout = match file.query_timeout_secs {
            Some(0) => {
                return Err(InputsError::InvalidSetting {
                    field: "query_timeout_secs",
                    message: "must be greater than zero".to_string(),
                });
            }
            Some(secs) => Some(Duration::from_secs(secs)),
            None => None,
        };

        Ok(Settings {
            data_path,
            sample_folder,
            phenotype,
            output_prefix,
            plink2_options: file.plink2_options.unwrap_or_default(),
            workflow,
            output: non_blank(file.output)
                .map(Utf8PathBuf::from)
                .unwrap_or_else(|| Utf8PathBuf::from(DEFAULT_OUTPUT_FILE)),
            query_timeout,
        })
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|value| !value.trim().is_empty())
}

fn required(value: Option<String>, field: &'static str) -> Result<String, InputsError> {
    non_blank(value).ok_or_else(|| InputsError::InvalidSetting {
        field,
        message: "must not be empty".to_string(),
    })
}
