use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::InputsError;

pub const DX_SCHEME: &str = "dx://";

static FILE_ID_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9][A-Za-z0-9._+\-]*(:[A-Za-z0-9._+\-]+)?$").unwrap());

/// Raw identifier as printed by `dx find data --brief`, e.g.
/// `project-xxxx:file-yyyy`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FileId(String);

impl FileId {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn to_uri(&self) -> DxUri {
        DxUri(format!("{DX_SCHEME}{}", self.0))
    }
}

impl fmt::Display for FileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for FileId {
    type Err = InputsError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        if !FILE_ID_RE.is_match(trimmed) {
            return Err(InputsError::InvalidFileId(value.to_string()));
        }
        Ok(Self(trimmed.to_string()))
    }
}

/// A fully qualified `dx://` reference accepted by the workflow runner.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DxUri(String);

impl DxUri {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for DxUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for DxUri {
    type Err = InputsError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let rest = value
            .strip_prefix(DX_SCHEME)
            .ok_or_else(|| InputsError::InvalidFileId(value.to_string()))?;
        let id: FileId = rest.parse()?;
        Ok(id.to_uri())
    }
}

/// Value for `dx find data --name`: either a glob such as `*.bgen` or an
/// exact file name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamePattern(String);

impl NamePattern {
    pub fn extension(ext: &str) -> Self {
        Self(format!("*.{ext}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NamePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for NamePattern {
    type Err = InputsError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        let is_valid = !trimmed.is_empty()
            && !trimmed.contains('/')
            && !trimmed.chars().any(|ch| ch.is_control());
        if !is_valid {
            return Err(InputsError::InvalidPattern(value.to_string()));
        }
        Ok(Self(trimmed.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn parse_file_id_valid() {
        let id: FileId = " project-GZ4q:file-Gb0X \n".parse().unwrap();
        assert_eq!(id.as_str(), "project-GZ4q:file-Gb0X");
        assert_eq!(id.to_uri().as_str(), "dx://project-GZ4q:file-Gb0X");
    }

    #[test]
    fn parse_file_id_accepts_bare_id() {
        let id: FileId = "id1".parse().unwrap();
        assert_eq!(id.to_uri().as_str(), "dx://id1");
    }

    #[test]
    fn parse_file_id_invalid() {
        for raw in ["", "dx://file-1", "file 1", "-file", "a:b:c"] {
            let err = raw.parse::<FileId>().unwrap_err();
            assert_matches!(err, InputsError::InvalidFileId(_));
        }
    }

    #[test]
    fn parse_uri_requires_scheme() {
        let uri: DxUri = "dx://project-a:file-1".parse().unwrap();
        assert_eq!(uri.as_str(), "dx://project-a:file-1");
        assert_matches!(
            "project-a:file-1".parse::<DxUri>(),
            Err(InputsError::InvalidFileId(_))
        );
    }

    #[test]
    fn name_patterns() {
        let bgen = NamePattern::extension("bgen");
        assert_eq!(bgen.as_str(), "*.bgen");

        let exact: NamePattern = " ischemia_df.phe ".parse().unwrap();
        assert_eq!(exact.as_str(), "ischemia_df.phe");

        assert_matches!(
            "/Data/x.phe".parse::<NamePattern>(),
            Err(InputsError::InvalidPattern(_))
        );
        assert_matches!("  ".parse::<NamePattern>(), Err(InputsError::InvalidPattern(_)));
    }
}
