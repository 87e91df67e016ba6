use super::config::DeploymentProfile;
use crate::db::Db;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub profile: Arc<DeploymentProfile>,
    pub db: Arc<Db>,
}
