use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::filter::Predicate;
use crate::mapping::{lookup, KeyPath, LeafMode, NestedMap};
use crate::table::{self, Delimiter, Error};

/// Where a mapping's contents come from.
#[derive(Debug, Clone, PartialEq)]
pub enum Loader {
    /// A text table, filtered and grouped along a key path.
    DelimitedText {
        path: PathBuf,
        delimiter: Delimiter,
        predicate: Predicate,
        key_path: KeyPath,
        mode: LeafMode,
    },
    /// A JSON or YAML document taken as the mapping verbatim.
    StructuredDocument { path: PathBuf },
}

impl Loader {
    pub fn path(&self) -> &Path {
        match self {
            Loader::DelimitedText { path, .. } => path,
            Loader::StructuredDocument { path } => path,
        }
    }

    pub fn load(&self) -> Result<NestedMap, Error> {
        match self {
            Loader::DelimitedText {
                path,
                delimiter,
                predicate,
                key_path,
                mode,
            } => {
                let table = table::load(path, *delimiter)?;
                let mapping = lookup(&table, predicate, key_path, *mode)?;
                if mapping.is_empty() {
                    log::info!("no rows of {} matched the filter", path.display());
                }

                return Ok(mapping);
            }
            Loader::StructuredDocument { path } => load_document(path),
        }
    }
}

fn load_document(path: &Path) -> Result<NestedMap, Error> {
    let contents = table::read_source(path)?;
    let extension = path
        .extension()
        .and_then(|extension| extension.to_str())
        .unwrap_or_default();

    let document: serde_yaml::Value = match extension {
        "json" => serde_json::from_str(&contents)
            .map_err(|error| Error::DocumentError(error.to_string()))?,
        "yaml" | "yml" => serde_yaml::from_str(&contents)
            .map_err(|error| Error::DocumentError(error.to_string()))?,
        _ => {
            return Err(Error::DocumentError(format!(
                "{} is neither `.json` nor `.yaml`",
                path.display()
            )))
        }
    };

    match document {
        serde_yaml::Value::Mapping(_) => to_nested(&document, ""),
        _ => Err(Error::DocumentError(String::from(
            "top level of the document must be a mapping",
        ))),
    }
}

fn to_nested(value: &serde_yaml::Value, at: &str) -> Result<NestedMap, Error> {
    if let Some(text) = scalar_text(value, at)? {
        return Ok(NestedMap::Value(text));
    }

    match value {
        serde_yaml::Value::Sequence(items) => {
            let mut values = Vec::with_capacity(items.len());
            for item in items {
                match scalar_text(item, at)? {
                    Some(text) => values.push(text),
                    None => {
                        return Err(Error::DocumentError(format!(
                            "list at `{}` may only hold scalars",
                            at
                        )))
                    }
                }
            }

            return Ok(NestedMap::List(values));
        }
        serde_yaml::Value::Mapping(entries) => {
            let mut children = BTreeMap::new();
            for (key, child) in entries {
                let key = match scalar_text(key, at)? {
                    Some(key) => key,
                    None => {
                        return Err(Error::DocumentError(format!(
                            "non-scalar key under `{}`",
                            at
                        )))
                    }
                };
                let child_at = if at.is_empty() {
                    key.clone()
                } else {
                    format!("{}.{}", at, key)
                };
                children.insert(key, to_nested(child, &child_at)?);
            }

            return Ok(NestedMap::Map(children));
        }
        serde_yaml::Value::Tagged(tagged) => to_nested(&tagged.value, at),
        _ => Err(Error::DocumentError(format!("null value at `{}`", at))),
    }
}

/// Decimals are refused: the parsed `f64` no longer carries the written
/// text (`1.10` would come back as `1.1`).
fn scalar_text(value: &serde_yaml::Value, at: &str) -> Result<Option<String>, Error> {
    match value {
        serde_yaml::Value::String(text) => Ok(Some(text.clone())),
        serde_yaml::Value::Number(number) if number.is_f64() => Err(Error::DocumentError(
            format!("decimal {} at `{}` has to be quoted", number, at),
        )),
        serde_yaml::Value::Number(number) => Ok(Some(number.to_string())),
        serde_yaml::Value::Bool(flag) => Ok(Some(flag.to_string())),
        _ => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use std::fs::File;
    use std::io::Write;

    use super::Loader;
    use crate::filter::{Accepted, Predicate};
    use crate::mapping::{CollisionPolicy, KeyPath, LeafMode, NestedMap};
    use crate::table::{Delimiter, Error};
    use tempfile::tempdir;

    #[test]
    fn delimited_text_source() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("amis.csv");

        let mut file = File::create(&file_path).unwrap();
        writeln!(file, "region,arch,ami").unwrap();
        writeln!(file, "us-east-1,x86_64,ami-111").unwrap();
        writeln!(file, "us-east-1,arm64,ami-222").unwrap();
        writeln!(file, "eu-west-1,x86_64,ami-333").unwrap();

        let loader = Loader::DelimitedText {
            path: file_path,
            delimiter: Delimiter::Char(b','),
            predicate: Predicate::new().with("arch", Accepted::Value(String::from("x86_64"))),
            key_path: KeyPath::new(["region", "arch", "ami"]).unwrap(),
            mode: LeafMode::Single(CollisionPolicy::Reject),
        };

        let mapping = loader.load().unwrap();
        assert_eq!(2, mapping.leaf_count());
        assert_eq!(
            Some(&NestedMap::Value(String::from("ami-333"))),
            mapping.get(&["eu-west-1", "x86_64"])
        );
    }

    #[test]
    fn yaml_document_source() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("sizes.yaml");

        let mut file = File::create(&file_path).unwrap();
        writeln!(file, "prod:").unwrap();
        writeln!(file, "  instance: m5.large").unwrap();
        writeln!(file, "  count: 3").unwrap();
        writeln!(file, "  zones: [a, b]").unwrap();
        writeln!(file, "dev:").unwrap();
        writeln!(file, "  public: true").unwrap();

        let mapping = Loader::StructuredDocument { path: file_path }.load().unwrap();
        assert_eq!(
            Some(&NestedMap::Value(String::from("3"))),
            mapping.get(&["prod", "count"])
        );
        assert_eq!(
            Some(&NestedMap::List(vec![String::from("a"), String::from("b")])),
            mapping.get(&["prod", "zones"])
        );
        assert_eq!(
            Some(&NestedMap::Value(String::from("true"))),
            mapping.get(&["dev", "public"])
        );
    }

    #[test]
    fn json_document_source() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("sizes.json");

        let mut file = File::create(&file_path).unwrap();
        writeln!(file, r#"{{"prod": {{"instance": "m5.large"}}}}"#).unwrap();

        let mapping = Loader::StructuredDocument { path: file_path }.load().unwrap();
        assert_eq!(2, mapping.depth());
        assert_eq!(
            Some(&NestedMap::Value(String::from("m5.large"))),
            mapping.get(&["prod", "instance"])
        );
    }

    #[test]
    fn document_with_null_is_rejected() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("broken.yaml");

        let mut file = File::create(&file_path).unwrap();
        writeln!(file, "prod:").unwrap();
        writeln!(file, "  instance: ~").unwrap();

        let result = Loader::StructuredDocument { path: file_path }.load();
        assert_eq!(
            Err(Error::DocumentError(String::from(
                "null value at `prod.instance`"
            ))),
            result
        );
    }

    #[test]
    fn unsupported_document_extension() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("sizes.toml");
        File::create(&file_path).unwrap();

        let result = Loader::StructuredDocument { path: file_path }.load();
        match result.err().unwrap() {
            Error::DocumentError(_) => {}
            _ => panic!("Expected `DocumentError` error"),
        }
    }

    #[test]
    fn missing_source_file() {
        let dir = tempdir().unwrap();
        let loader = Loader::StructuredDocument {
            path: dir.path().join("absent.yaml"),
        };

        match loader.load().err().unwrap() {
            Error::FileNotFound(_) => {}
            _ => panic!("Expected `FileNotFound` error"),
        }
    }

    #[test]
    fn unquoted_decimal_is_rejected() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("versions.yaml");

        let mut file = File::create(&file_path).unwrap();
        writeln!(file, "prod:").unwrap();
        writeln!(file, "  version: 1.10").unwrap();
        writeln!(file, "dev:").unwrap();
        writeln!(file, "  version: '1.10'").unwrap();

        let result = Loader::StructuredDocument { path: file_path }.load();
        assert_eq!(
            Err(Error::DocumentError(String::from(
                "decimal 1.1 at `prod.version` has to be quoted"
            ))),
            result
        );
    }

    #[test]
    fn quoted_decimal_keeps_its_text() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("versions.json");

        let mut file = File::create(&file_path).unwrap();
        writeln!(file, r#"{{"prod": {{"version": "1.10"}}}}"#).unwrap();

        let mapping = Loader::StructuredDocument { path: file_path }.load().unwrap();
        assert_eq!(
            Some(&NestedMap::Value(String::from("1.10"))),
            mapping.get(&["prod", "version"])
        );
    }
}
