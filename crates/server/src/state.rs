use std::sync::Arc;
use pdfsmith_core::{Config, PdfService, SanitizedConfig};

/// Shared application state
pub struct AppState {
    config: Config,
    service: Arc<PdfService>,
}

impl AppState {
    pub fn new(config: Config, service: Arc<PdfService>) -> Self {
        Self { config, service }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn sanitized_config(&self) -> SanitizedConfig {
        SanitizedConfig::from(&self.config)
    }

    pub fn service(&self) -> &PdfService {
        self.service.as_ref()
    }
}
