use std::collections::HashSet;

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

use crate::mapping::NestedMap;

pub const FORMAT_VERSION: &str = "2010-09-09";

#[derive(thiserror::Error, Debug, PartialEq)]
pub enum Error {
    #[error("Mapping name `{0}` must be non-empty and alphanumeric")]
    InvalidName(String),

    #[error("Mapping `{0}` is declared more than once")]
    DuplicateName(String),
}

/// Sections carried into the template untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Declarations {
    pub description: Option<String>,
    pub parameters: Option<serde_json::Value>,
    pub resources: Option<serde_json::Value>,
    pub outputs: Option<serde_json::Value>,
}

/// Named mappings in declaration order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Mappings(Vec<(String, NestedMap)>);

impl Mappings {
    pub fn get(&self, name: &str) -> Option<&NestedMap> {
        self.0
            .iter()
            .find(|(mapping_name, _)| mapping_name == name)
            .map(|(_, mapping)| mapping)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|(name, _)| name.as_str())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Serialize for Mappings {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (name, mapping) in &self.0 {
            map.serialize_entry(name, mapping)?;
        }
        map.end()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Template {
    #[serde(rename = "AWSTemplateFormatVersion")]
    pub format_version: &'static str,

    #[serde(rename = "Description", skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(rename = "Parameters", skip_serializing_if = "Option::is_none")]
    pub parameters: Option<serde_json::Value>,

    #[serde(rename = "Mappings", skip_serializing_if = "Mappings::is_empty")]
    pub mappings: Mappings,

    #[serde(rename = "Resources", skip_serializing_if = "Option::is_none")]
    pub resources: Option<serde_json::Value>,

    #[serde(rename = "Outputs", skip_serializing_if = "Option::is_none")]
    pub outputs: Option<serde_json::Value>,
}

/// Builds the template from every declared mapping at once.
pub fn assemble(
    declarations: Declarations,
    mappings: Vec<(String, NestedMap)>,
) -> Result<Template, Error> {
    let mut seen = HashSet::new();
    for (name, mapping) in &mappings {
        if name.is_empty() || !name.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(Error::InvalidName(name.clone()));
        }
        if !seen.insert(name.as_str()) {
            return Err(Error::DuplicateName(name.clone()));
        }

        // CloudFormation looks mappings up with exactly two keys.
        if mapping.depth() != 2 {
            log::warn!(
                "mapping `{}` is {} levels deep, Fn::FindInMap expects 2",
                name,
                mapping.depth()
            );
        }
    }

    return Ok(Template {
        format_version: FORMAT_VERSION,
        description: declarations.description,
        parameters: declarations.parameters,
        mappings: Mappings(mappings),
        resources: declarations.resources,
        outputs: declarations.outputs,
    });
}
