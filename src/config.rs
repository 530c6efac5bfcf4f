use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::{fs, io, path::Path, path::PathBuf};
use validator::{Validate, ValidationError};

use crate::filter::{Accepted, Predicate};
use crate::loader::Loader;
use crate::mapping::{CollisionPolicy, KeyPath, LeafMode};
use crate::table::Delimiter;
use crate::template::Declarations;

#[derive(thiserror::Error, Debug, PartialEq)]
pub enum Error {
    #[error("File {0} not found")]
    FileNotFound(String),

    #[error("Parsing error: {0}")]
    ParsingError(String),

    #[error("Validation errors: {0}")]
    ValidationError(String),

    #[error("Unknown error occurred: {0}")]
    Unknown(String),
}

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct ConfigFile {
    pub location: PathBuf,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceFormat {
    #[default]
    Delimited,
    Structured,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OnCollision {
    #[default]
    Overwrite,
    Reject,
}

/// A YAML scalar as written in a filter; compared as text. Unquoted
/// decimals lose their spelling (`1.10` parses as `1.1`), so validation
/// rejects them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    Text(String),
    Integer(i64),
    Float(f64),
    Bool(bool),
}

impl Scalar {
    fn to_text(&self) -> String {
        match self {
            Scalar::Text(text) => text.clone(),
            Scalar::Integer(number) => number.to_string(),
            Scalar::Float(number) => number.to_string(),
            Scalar::Bool(flag) => flag.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FilterValue {
    One(Scalar),
    AnyOf(Vec<Scalar>),
}

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct SourceEntry {
    pub location: PathBuf,

    #[serde(default)]
    pub format: SourceFormat,

    #[validate(custom = "validate_delimiter")]
    pub delimiter: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct MappingEntry {
    #[validate(custom = "validate_mapping_name")]
    pub name: String,

    pub source: SourceEntry,

    #[serde(default)]
    #[validate(custom = "validate_filter")]
    pub filter: BTreeMap<String, FilterValue>,

    #[validate(length(min = 1))]
    pub key_path: Option<Vec<String>>,

    #[serde(default)]
    pub multimap: bool,

    #[serde(default)]
    pub on_collision: OnCollision,
}

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct Config {
    pub description: Option<String>,

    pub region: Option<String>,

    #[serde(default, rename = "validate")]
    pub remote_validation: bool,

    #[validate(custom = "validate_output_file")]
    pub output: ConfigFile,

    #[validate(length(min = 1))]
    pub mappings: Vec<MappingEntry>,

    pub parameters: Option<serde_json::Value>,

    pub resources: Option<serde_json::Value>,

    pub outputs: Option<serde_json::Value>,
}

impl Config {
    pub fn declarations(&self) -> Declarations {
        Declarations {
            description: self.description.clone(),
            parameters: self.parameters.clone(),
            resources: self.resources.clone(),
            outputs: self.outputs.clone(),
        }
    }
}

impl MappingEntry {
    /// Turns the entry into a loader; paths are taken relative to `base`.
    pub fn loader(&self, base: &Path) -> Result<Loader, Error> {
        let path = base.join(&self.source.location);

        if self.source.format == SourceFormat::Structured {
            return Ok(Loader::StructuredDocument { path });
        }

        let key_path = match &self.key_path {
            Some(columns) => KeyPath::new(columns.iter().cloned())
                .map_err(|error| Error::ValidationError(error.to_string()))?,
            None => {
                return Err(Error::ValidationError(format!(
                    "mapping `{}` reads a delimited table but has no key_path",
                    self.name
                )))
            }
        };

        let predicate = self
            .filter
            .iter()
            .fold(Predicate::new(), |predicate, (column, value)| {
                let accepted = match value {
                    FilterValue::One(scalar) => Accepted::Value(scalar.to_text()),
                    FilterValue::AnyOf(scalars) => {
                        Accepted::any_of(scalars.iter().map(Scalar::to_text))
                    }
                };
                predicate.with(column.clone(), accepted)
            });

        let mode = match (self.multimap, self.on_collision) {
            (true, _) => LeafMode::Multi,
            (false, OnCollision::Overwrite) => LeafMode::Single(CollisionPolicy::Overwrite),
            (false, OnCollision::Reject) => LeafMode::Single(CollisionPolicy::Reject),
        };

        return Ok(Loader::DelimitedText {
            path,
            delimiter: parse_delimiter(self.source.delimiter.as_deref())?,
            predicate,
            key_path,
            mode,
        });
    }
}

pub fn parse(path: &PathBuf) -> Result<Config, Error> {
    let contents = match fs::read_to_string(path) {
        Ok(raw_contents) => Ok(raw_contents),
        Err(error) => match error.kind() {
            io::ErrorKind::NotFound => Err(Error::FileNotFound(path.display().to_string())),
            _ => Err(Error::Unknown(error.to_string())),
        },
    }?;

    let config: Config = match serde_yaml::from_str(&contents) {
        Ok(data) => Ok(data),
        Err(error) => Err(Error::ParsingError(error.to_string())),
    }?;

    match config.validate() {
        Ok(_) => (),
        Err(error) => return Err(Error::ValidationError(error.to_string())),
    }
    for mapping_entry in &config.mappings {
        match mapping_entry.validate() {
            Ok(_) => (),
            Err(error) => return Err(Error::ValidationError(error.to_string())),
        }
        match mapping_entry.source.validate() {
            Ok(_) => (),
            Err(error) => return Err(Error::ValidationError(error.to_string())),
        }
    }

    return Ok(config);
}

fn parse_delimiter(delimiter: Option<&str>) -> Result<Delimiter, Error> {
    match delimiter {
        None | Some("whitespace") => Ok(Delimiter::Whitespace),
        Some(raw) if raw.len() == 1 && raw.is_ascii() => Ok(Delimiter::Char(raw.as_bytes()[0])),
        Some(raw) => Err(Error::ValidationError(format!(
            "delimiter `{}` is neither `whitespace` nor a single ASCII character",
            raw
        ))),
    }
}

fn validate_delimiter(delimiter: &str) -> Result<(), ValidationError> {
    match parse_delimiter(Some(delimiter)) {
        Ok(_) => Ok(()),
        Err(_) => Err(ValidationError::new(
            "The delimiter has to be `whitespace` or a single ASCII character",
        )),
    }
}

fn validate_filter(filter: &BTreeMap<String, FilterValue>) -> Result<(), ValidationError> {
    let is_decimal = |scalar: &Scalar| matches!(scalar, Scalar::Float(_));
    let has_decimal = filter.values().any(|value| match value {
        FilterValue::One(scalar) => is_decimal(scalar),
        FilterValue::AnyOf(scalars) => scalars.iter().any(is_decimal),
    });
    if has_decimal {
        return Err(ValidationError::new(
            "Decimal filter values have to be quoted to keep their exact text",
        ));
    }

    return Ok(());
}

fn validate_mapping_name(name: &str) -> Result<(), ValidationError> {
    if name.is_empty() || !name.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(ValidationError::new(
            "Mapping names have to be non-empty and alphanumeric",
        ));
    }

    return Ok(());
}

fn validate_output_file(output_file: &ConfigFile) -> Result<(), ValidationError> {
    let file_extension = match output_file.location.extension() {
        Some(extension) => extension,
        None => {
            return Err(ValidationError::new(
                "Unable to parse the extension of the output file location",
            ))
        }
    };
    if file_extension != "json" && file_extension != "yaml" && file_extension != "yml" {
        return Err(ValidationError::new(
            "The output file location has to end with `.json`, `.yaml` or `.yml`",
        ));
    }

    return Ok(());
}
