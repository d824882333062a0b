use serde::Deserialize;

use crate::Config;
use crate::shared::{
    ExtractionConfig, GatewayConfig, PersistenceConfig, PipelineConfig, ValidationError,
};

/// Complete configuration of the ingestion daemon.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    pub pipeline: PipelineConfig,
    pub gateway: GatewayConfig,
    pub persistence: PersistenceConfig,
    pub extraction: ExtractionConfig,
}

impl IngestConfig {
    /// Validates every section.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.pipeline.validate()?;
        self.persistence.validate()?;

        if self.extraction.max_text_len == 0 {
            return Err(ValidationError::Zero("extraction.max_text_len"));
        }

        Ok(())
    }
}

impl Config for IngestConfig {
    const LIST_PARSE_KEYS: &'static [&'static str] = &["extraction.skip_labels"];
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    #[test]
    fn test_deserializes_postgres_persistence() {
        let config: IngestConfig = serde_json::from_str(
            r#"{
                "gateway": {"port": 7000, "secret": "s3cret"},
                "persistence": {
                    "kind": "postgres",
                    "connection": {
                        "host": "localhost",
                        "port": 5432,
                        "name": "ingest",
                        "username": "postgres",
                        "password": null
                    }
                }
            }"#,
        )
        .unwrap();

        assert_eq!(config.gateway.address(), "127.0.0.1:7000");
        assert_eq!(
            config.gateway.secret.as_ref().map(|s| s.expose_secret().as_str()),
            Some("s3cret")
        );
        let PersistenceConfig::Postgres {
            connection,
            max_connections,
        } = &config.persistence
        else {
            panic!("expected postgres persistence");
        };
        let connection = connection.as_ref().unwrap();
        assert_eq!(connection.name, "ingest");
        assert!(!connection.tls.enabled);
        assert_eq!(*max_connections, PersistenceConfig::DEFAULT_MAX_CONNECTIONS);
        assert_eq!(config.validate(), Ok(()));
    }

    #[test]
    fn test_tls_without_certificates_is_invalid() {
        let config: IngestConfig = serde_json::from_str(
            r#"{
                "persistence": {
                    "kind": "postgres",
                    "connection": {
                        "host": "localhost",
                        "port": 5432,
                        "name": "ingest",
                        "username": "postgres",
                        "tls": {"enabled": true, "trusted_root_certs": ""}
                    }
                }
            }"#,
        )
        .unwrap();

        assert_eq!(
            config.validate(),
            Err(ValidationError::MissingTrustedRootCerts)
        );
    }

    #[test]
    fn test_default_configuration_requires_a_document_store() {
        let config = IngestConfig::default();

        assert_eq!(config.validate(), Err(ValidationError::MissingConnection));
    }
}
