use crate::config::Config;
use crate::generate::Coordinator;
use crate::store::{CertificateRecords, TemplateStore};
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub coordinator: Arc<Coordinator>,
    pub templates: Arc<dyn TemplateStore>,
    pub certificates: Arc<dyn CertificateRecords>,
}
