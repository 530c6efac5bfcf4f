use std::path::{Path, PathBuf};

use anyhow::Context;

pub mod config;
pub mod filter;
pub mod loader;
pub mod mapping;
pub mod stack;
pub mod table;
pub mod template;
pub mod writer;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();

    let config_path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("./config.yaml"));
    let config = config::parse(&config_path)
        .with_context(|| format!("Unable to read {}", config_path.display()))?;
    let base = config_path.parent().unwrap_or_else(|| Path::new("."));

    let mut mappings = Vec::with_capacity(config.mappings.len());
    for mapping_entry in &config.mappings {
        let loader = mapping_entry.loader(base)?;
        let mapping = loader.load().with_context(|| {
            format!(
                "Unable to build mapping `{}` from {}",
                mapping_entry.name,
                loader.path().display()
            )
        })?;

        log::info!(
            "mapping `{}`: {} leaves, {} levels",
            mapping_entry.name,
            mapping.leaf_count(),
            mapping.depth()
        );
        mappings.push((mapping_entry.name.clone(), mapping));
    }

    let template = template::assemble(config.declarations(), mappings)?;
    log::info!(
        "assembled {} mappings: {}",
        template.mappings.len(),
        template.mappings.names().collect::<Vec<_>>().join(", ")
    );
    let output_path = base.join(&config.output.location);
    let template_body = writer::write(&output_path, &template)?;

    if config.remote_validation {
        let validator = stack::TemplateValidator::new(config.region.as_ref()).await?;
        let verdict = validator
            .validate(&template_body)
            .await
            .with_context(|| format!("{} was rejected", output_path.display()))?;

        log::info!(
            "{} is valid in {} ({} parameters)",
            output_path.display(),
            validator.region,
            verdict.parameters.len()
        );
        if let Some(description) = verdict.description {
            log::info!("CloudFormation reports description: {}", description);
        }
    }

    return Ok(());
}
