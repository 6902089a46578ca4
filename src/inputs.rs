//! The workflow input document handed to dxCompiler via `-inputs`.
//!
//! Keys are namespaced by the workflow name (`bgens_qc.ref_first`, ...).
//! A document starts as a template where every key only carries its type
//! descriptor; the assembler removes or fills each one before it can be
//! serialized.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::domain::DxUri;
use crate::error::InputsError;

pub const DEFAULT_WORKFLOW: &str = "bgens_qc";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum InputKey {
    ExtractFiles,
    RefFirst,
    KeepFile,
    OutputPrefix,
    Plink2Options,
    GenoSampleFiles,
    GenoBgenFiles,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    /// Declared by the workflow but never passed; only its absence is valid.
    Omitted,
    Flag,
    File,
    Text,
    Files { non_empty: bool },
}

impl InputKey {
    pub const ALL: [InputKey; 7] = [
        InputKey::ExtractFiles,
        InputKey::RefFirst,
        InputKey::KeepFile,
        InputKey::OutputPrefix,
        InputKey::Plink2Options,
        InputKey::GenoSampleFiles,
        InputKey::GenoBgenFiles,
    ];

    pub fn name(self) -> &'static str {
        match self {
            InputKey::ExtractFiles => "extract_files",
            InputKey::RefFirst => "ref_first",
            InputKey::KeepFile => "keep_file",
            InputKey::OutputPrefix => "output_prefix",
            InputKey::Plink2Options => "plink2_options",
            InputKey::GenoSampleFiles => "geno_sample_files",
            InputKey::GenoBgenFiles => "geno_bgen_files",
        }
    }

    /// WDL-style type as listed by `dxCompiler describe`.
    pub fn type_descriptor(self) -> &'static str {
        match self {
            InputKey::ExtractFiles => "Array[File]",
            InputKey::RefFirst => "Boolean (optional, default = true)",
            InputKey::KeepFile => "File? (optional)",
            InputKey::OutputPrefix => "String",
            InputKey::Plink2Options => "String (optional, default = \"\")",
            InputKey::GenoSampleFiles => "Array[File]+",
            InputKey::GenoBgenFiles => "Array[File]+",
        }
    }

    pub fn kind(self) -> ValueKind {
        match self {
            InputKey::RefFirst => ValueKind::Flag,
            InputKey::KeepFile => ValueKind::File,
            InputKey::OutputPrefix | InputKey::Plink2Options => ValueKind::Text,
            InputKey::ExtractFiles => ValueKind::Omitted,
            InputKey::GenoSampleFiles | InputKey::GenoBgenFiles => {
                ValueKind::Files { non_empty: true }
            }
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|key| key.name() == name)
    }
}

impl fmt::Display for InputKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum InputValue {
    Flag(bool),
    Text(String),
    Files(Vec<String>),
}

impl InputValue {
    pub fn file(uri: DxUri) -> Self {
        InputValue::Text(uri.into_string())
    }

    pub fn files(uris: Vec<DxUri>) -> Self {
        InputValue::Files(uris.into_iter().map(DxUri::into_string).collect())
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Slot {
    Declared,
    Value(InputValue),
}

#[derive(Debug, Clone, PartialEq)]
pub struct InputConfiguration {
    workflow: String,
    slots: BTreeMap<InputKey, Slot>,
}

impl InputConfiguration {
    /// Every recognized key, each holding only its type descriptor.
    pub fn template(workflow: &str) -> Self {
        let slots = InputKey::ALL
            .into_iter()
            .map(|key| (key, Slot::Declared))
            .collect();
        Self {
            workflow: workflow.to_string(),
            slots,
        }
    }

    pub fn workflow(&self) -> &str {
        &self.workflow
    }

    pub fn qualified_key(&self, key: InputKey) -> String {
        format!("{}.{}", self.workflow, key.name())
    }

    pub fn contains(&self, key: InputKey) -> bool {
        self.slots.contains_key(&key)
    }

    pub fn get(&self, key: InputKey) -> Option<&InputValue> {
        match self.slots.get(&key) {
            Some(Slot::Value(value)) => Some(value),
            _ => None,
        }
    }

    pub fn remove(&mut self, key: InputKey) -> bool {
        self.slots.remove(&key).is_some()
    }

    pub fn set(&mut self, key: InputKey, value: InputValue) -> Result<(), InputsError> {
        check_value(key, &value)?;
        self.slots.insert(key, Slot::Value(value));
        Ok(())
    }

    /// The document with unset keys rendered as their type descriptors.
    pub fn describe(&self) -> Value {
        let map = self
            .slots
            .iter()
            .map(|(key, slot)| {
                let value = match slot {
                    Slot::Declared => Value::String(key.type_descriptor().to_string()),
                    Slot::Value(value) => to_json_value(value),
                };
                (self.qualified_key(*key), value)
            })
            .collect::<Map<_, _>>();
        Value::Object(map)
    }

    /// Serializable form. Fails if any key still only holds its descriptor.
    pub fn to_json(&self) -> Result<Value, InputsError> {
        let mut map = Map::new();
        for (key, slot) in &self.slots {
            match slot {
                Slot::Declared => return Err(InputsError::UnsetInput(self.qualified_key(*key))),
                Slot::Value(value) => {
                    map.insert(self.qualified_key(*key), to_json_value(value));
                }
            }
        }
        Ok(Value::Object(map))
    }

    pub fn from_json(workflow: &str, document: &Value) -> Result<Self, InputsError> {
        let object = document
            .as_object()
            .ok_or_else(|| InputsError::InvalidDocument("expected a JSON object".to_string()))?;
        let namespace = format!("{workflow}.");

        let mut slots = BTreeMap::new();
        for (name, raw) in object {
            let key = name
                .strip_prefix(&namespace)
                .and_then(InputKey::from_name)
                .ok_or_else(|| InputsError::InvalidDocument(format!("unknown input {name}")))?;
            let value: InputValue = serde_json::from_value(raw.clone())
                .map_err(|err| InputsError::InvalidDocument(format!("{name}: {err}")))?;
            check_value(key, &value)?;
            slots.insert(key, Slot::Value(value));
        }

        Ok(Self {
            workflow: workflow.to_string(),
            slots,
        })
    }
}

fn to_json_value(value: &InputValue) -> Value {
    match value {
        InputValue::Flag(flag) => Value::Bool(*flag),
        InputValue::Text(text) => Value::String(text.clone()),
        InputValue::Files(files) => {
            Value::Array(files.iter().cloned().map(Value::String).collect())
        }
    }
}

fn check_value(key: InputKey, value: &InputValue) -> Result<(), InputsError> {
    let mismatch = |expected: &str| {
        InputsError::InvalidDocument(format!("{key} expects {expected}"))
    };
    match (key.kind(), value) {
        (ValueKind::Omitted, _) => Err(InputsError::InvalidDocument(format!(
            "{key} must be left out, not set"
        ))),
        (ValueKind::Flag, InputValue::Flag(_)) => Ok(()),
        (ValueKind::Text, InputValue::Text(_)) => Ok(()),
        (ValueKind::File, InputValue::Text(uri)) => check_uri(key, uri),
        (ValueKind::Files { non_empty }, InputValue::Files(uris)) => {
            if non_empty && uris.is_empty() {
                return Err(mismatch("at least one file"));
            }
            uris.iter().try_for_each(|uri| check_uri(key, uri))
        }
        (ValueKind::Flag, _) => Err(mismatch("a boolean")),
        (ValueKind::Text, _) => Err(mismatch("a string")),
        (ValueKind::File, _) => Err(mismatch("a dx:// file reference")),
        (ValueKind::Files { .. }, _) => Err(mismatch("a list of dx:// file references")),
    }
}

fn check_uri(key: InputKey, uri: &str) -> Result<(), InputsError> {
    uri.parse::<DxUri>()
        .map(|_| ())
        .map_err(|_| InputsError::InvalidDocument(format!("{key}: not a dx:// reference: {uri}")))
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use serde_json::json;

    use super::*;

    fn uri(raw: &str) -> DxUri {
        raw.parse().unwrap()
    }

    #[test]
    fn template_lists_every_key_with_descriptor() {
        let template = InputConfiguration::template(DEFAULT_WORKFLOW);
        let described = template.describe();
        assert_eq!(described["bgens_qc.extract_files"], json!("Array[File]"));
        assert_eq!(described["bgens_qc.geno_bgen_files"], json!("Array[File]+"));
        assert_eq!(described.as_object().unwrap().len(), 7);
    }

    #[test]
    fn unset_keys_block_serialization() {
        let mut doc = InputConfiguration::template(DEFAULT_WORKFLOW);
        doc.remove(InputKey::ExtractFiles);
        let err = doc.to_json().unwrap_err();
        assert_matches!(err, InputsError::UnsetInput(name) if name == "bgens_qc.ref_first");
    }

    #[test]
    fn set_rejects_wrong_kind() {
        let mut doc = InputConfiguration::template(DEFAULT_WORKFLOW);
        assert_matches!(
            doc.set(InputKey::RefFirst, InputValue::Text("yes".to_string())),
            Err(InputsError::InvalidDocument(_))
        );
        assert_matches!(
            doc.set(InputKey::GenoBgenFiles, InputValue::Files(Vec::new())),
            Err(InputsError::InvalidDocument(_))
        );
        assert_matches!(
            doc.set(InputKey::KeepFile, InputValue::Text("file-1".to_string())),
            Err(InputsError::InvalidDocument(_))
        );
        assert_matches!(
            doc.set(InputKey::ExtractFiles, InputValue::Files(Vec::new())),
            Err(InputsError::InvalidDocument(_))
        );
        assert_matches!(
            doc.set(InputKey::ExtractFiles, InputValue::files(vec![uri("dx://x1")])),
            Err(InputsError::InvalidDocument(_))
        );
    }

    #[test]
    fn json_round_trip() {
        let mut doc = InputConfiguration::template("custom_qc");
        doc.remove(InputKey::ExtractFiles);
        doc.remove(InputKey::KeepFile);
        doc.set(InputKey::RefFirst, InputValue::Flag(true)).unwrap();
        doc.set(InputKey::OutputPrefix, InputValue::Text("out".to_string()))
            .unwrap();
        doc.set(InputKey::Plink2Options, InputValue::Text(String::new()))
            .unwrap();
        doc.set(
            InputKey::GenoSampleFiles,
            InputValue::files(vec![uri("dx://s1")]),
        )
        .unwrap();
        doc.set(
            InputKey::GenoBgenFiles,
            InputValue::files(vec![uri("dx://b1"), uri("dx://b2")]),
        )
        .unwrap();

        let value = doc.to_json().unwrap();
        assert_eq!(value["custom_qc.geno_bgen_files"], json!(["dx://b1", "dx://b2"]));

        let parsed = InputConfiguration::from_json("custom_qc", &value).unwrap();
        assert_eq!(parsed, doc);
    }

    #[test]
    fn from_json_rejects_foreign_keys() {
        let value = json!({ "other.ref_first": true });
        assert_matches!(
            InputConfiguration::from_json(DEFAULT_WORKFLOW, &value),
            Err(InputsError::InvalidDocument(_))
        );

        let value = json!({ "bgens_qc.extract_files": [] });
        assert_matches!(
            InputConfiguration::from_json(DEFAULT_WORKFLOW, &value),
            Err(InputsError::InvalidDocument(_))
        );

        let value = json!({ "bgens_qc.chromosomes": ["1"] });
        assert_matches!(
            InputConfiguration::from_json(DEFAULT_WORKFLOW, &value),
            Err(InputsError::InvalidDocument(_))
        );
    }
}
