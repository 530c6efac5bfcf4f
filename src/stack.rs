use aws_config::meta::region::RegionProviderChain;
use aws_types::region::Region;

#[derive(thiserror::Error, Debug, PartialEq)]
pub enum Error {
    #[error("Service error ocurred: {0}.")]
    ServiceError(String),

    #[error("Unknown error ocurred: {0}.")]
    UnknownError(String),

    #[error("No region configured and none found in the environment")]
    MissingRegion,
}

/// What CloudFormation reported back for a valid template.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Verdict {
    pub description: Option<String>,
    pub parameters: Vec<String>,
}

pub struct TemplateValidator {
    pub region: Region,

    client: aws_sdk_cloudformation::Client,
}

impl TemplateValidator {
    pub async fn new(region: Option<&String>) -> Result<Self, Error> {
        let region = match region {
            Some(provided_region) => Region::new(provided_region.clone()),
            None => match RegionProviderChain::default_provider().region().await {
                Some(found_region) => found_region,
                None => return Err(Error::MissingRegion),
            },
        };

        let sdk_config = aws_config::from_env()
            .region(region.clone())
            .load()
            .await;
        let client = aws_sdk_cloudformation::Client::new(&sdk_config);

        return Ok(Self { region, client });
    }

    pub async fn validate(&self, template_body: &str) -> Result<Verdict, Error> {
        let result = self
            .client
            .validate_template()
            .template_body(template_body)
            .send()
            .await;

        let result = match result {
            Ok(data) => data,
            Err(aws_sdk_cloudformation::types::SdkError::ServiceError { err, .. }) => {
                return Err(Error::ServiceError(err.to_string()));
            }
            Err(err) => return Err(Error::UnknownError(err.to_string())),
        };

        let parameters = result
            .parameters()
            .unwrap_or_else(|| &[])
            .iter()
            .filter_map(|parameter| parameter.parameter_key())
            .map(String::from)
            .collect();

        return Ok(Verdict {
            description: result.description().map(String::from),
            parameters,
        });
    }
}
