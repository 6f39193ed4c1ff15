use super::{SoundEntry, SoundsResponse};
use crate::config::ConfigurationResponse;
use crate::error::{Result, SonoError};
use std::path::Path;

/// Network-fetch collaborator: supplies the configuration record and the
/// sound catalogue at startup.
pub trait CatalogueSource {
    fn fetch_configuration(&self) -> Result<ConfigurationResponse>;
    fn fetch_sounds(&self) -> Result<Vec<SoundEntry>>;
}

/// Parses the endpoints' JSON bodies from memory or disk.
#[derive(Debug, Clone)]
pub struct JsonCatalogueSource {
    configuration: String,
    sounds: String,
}

impl JsonCatalogueSource {
    pub fn from_strings(configuration: impl Into<String>, sounds: impl Into<String>) -> Self {
        Self {
            configuration: configuration.into(),
            sounds: sounds.into(),
        }
    }

    pub fn from_files(
        configuration: impl AsRef<Path>,
        sounds: impl AsRef<Path>,
    ) -> Result<Self> {
        Ok(Self::from_strings(read(configuration.as_ref())?, read(sounds.as_ref())?))
    }
}

fn read(path: &Path) -> Result<String> {
    std::fs::read_to_string(path)
        .map_err(|e| SonoError::Catalogue(format!("{}: {}", path.display(), e)))
}

impl CatalogueSource for JsonCatalogueSource {
    fn fetch_configuration(&self) -> Result<ConfigurationResponse> {
        Ok(serde_json::from_str(&self.configuration)?)
    }

    fn fetch_sounds(&self) -> Result<Vec<SoundEntry>> {
        let response: SoundsResponse = serde_json::from_str(&self.sounds)?;
        Ok(response.sounds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parses_both_bodies() {
        let source = JsonCatalogueSource::from_strings(
            r#"{"configuration": null}"#,
            r#"{"sounds": [{"id": 1, "directionX": 1.0, "directionY": 0.0,
                "directionZ": 0.0, "location": "a.mp3", "selected": true}]}"#,
        );
        assert!(source.fetch_configuration().unwrap().configuration.is_none());
        let sounds = source.fetch_sounds().unwrap();
        assert_eq!(sounds.len(), 1);
        assert!(sounds[0].selected);
    }

    #[test]
    fn test_malformed_body_is_an_error() {
        let source = JsonCatalogueSource::from_strings("{", "[]");
        assert!(source.fetch_configuration().is_err());
        assert!(source.fetch_sounds().is_err());
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let result = JsonCatalogueSource::from_files("/nonexistent/config.json", "/nonexistent/sounds.json");
        assert!(matches!(result, Err(SonoError::Catalogue(_))));
    }
}
