use std::fs::{self};
use std::path::Path;

use crate::template::Template;

#[derive(thiserror::Error, Debug, PartialEq)]
pub enum Error {
    #[error("Unsupported output format for {0}")]
    UnsupportedFormat(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Unable to write {0}")]
    WriteError(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Json,
    Yaml,
}

impl Format {
    pub fn from_path(path: &Path) -> Result<Self, Error> {
        let extension = path.extension().and_then(|extension| extension.to_str());
        match extension {
            Some("json") => Ok(Format::Json),
            Some("yaml") | Some("yml") => Ok(Format::Yaml),
            _ => Err(Error::UnsupportedFormat(path.display().to_string())),
        }
    }
}

pub fn render(template: &Template, format: Format) -> Result<String, Error> {
    let rendered = match format {
        Format::Json => serde_json::to_string_pretty(template)
            .map_err(|error| Error::SerializationError(error.to_string())),
        Format::Yaml => serde_yaml::to_string(template)
            .map_err(|error| Error::SerializationError(error.to_string())),
    }?;

    return Ok(rendered);
}

/// Renders the template in the format implied by `path` and writes it there.
/// Returns the rendered body.
pub fn write(path: &Path, template: &Template) -> Result<String, Error> {
    let file_contents = render(template, Format::from_path(path)?)?;
    match fs::write(path, &file_contents) {
        Ok(_) => {}
        Err(error) => {
            return Err(Error::WriteError(format!(
                "{}: {}",
                path.display(),
                error
            )))
        }
    }

    log::info!("wrote {} ({} bytes)", path.display(), file_contents.len());
    return Ok(file_contents);
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::PathBuf;

    use super::write;
    use super::Error;
    use super::Format;
    use crate::mapping::NestedMap;
    use crate::template::{assemble, Declarations};
    use tempfile::tempdir;

    fn sample_template() -> crate::template::Template {
        let mapping = NestedMap::Map(
            [(
                String::from("us-east-1"),
                NestedMap::Map(
                    [(String::from("ami"), NestedMap::Value(String::from("ami-1")))]
                        .into_iter()
                        .collect(),
                ),
            )]
            .into_iter()
            .collect(),
        );

        assemble(
            Declarations::default(),
            vec![(String::from("AmiMap"), mapping)],
        )
        .unwrap()
    }

    #[test]
    fn format_from_extension() {
        assert_eq!(Ok(Format::Json), Format::from_path(&PathBuf::from("out.json")));
        assert_eq!(Ok(Format::Yaml), Format::from_path(&PathBuf::from("out.yml")));
        match Format::from_path(&PathBuf::from("out.txt")).err().unwrap() {
            Error::UnsupportedFormat(_) => {}
            _ => panic!("Expected `UnsupportedFormat` error"),
        }
    }

    #[test]
    fn writes_json() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("template.json");

        let body = write(&file_path, &sample_template()).unwrap();
        let on_disk = fs::read_to_string(&file_path).unwrap();
        assert_eq!(body, on_disk);

        let parsed: serde_json::Value = serde_json::from_str(&on_disk).unwrap();
        assert_eq!(parsed["Mappings"]["AmiMap"]["us-east-1"]["ami"], "ami-1");
    }

    #[test]
    fn writes_yaml() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("template.yaml");

        write(&file_path, &sample_template()).unwrap();
        let parsed: serde_yaml::Value =
            serde_yaml::from_str(&fs::read_to_string(&file_path).unwrap()).unwrap();
        assert_eq!(parsed["AWSTemplateFormatVersion"], "2010-09-09");
        assert_eq!(parsed["Mappings"]["AmiMap"]["us-east-1"]["ami"], "ami-1");
    }

    #[test]
    fn missing_directory_is_write_error() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("nested").join("template.json");

        match write(&file_path, &sample_template()).err().unwrap() {
            Error::WriteError(_) => {}
            _ => panic!("Expected `WriteError` error"),
        }
    }
}
