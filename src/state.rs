//! Shared state handed to every handler.

use crate::services::{
    ad_service::AdService, storage_service::StorageService, upload_service::UploadService,
};
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    /// Local backend, used directly for serving and readiness checks.
    pub storage: StorageService,
    pub uploads: UploadService,
    pub ads: AdService,
    /// Expected bearer token for admin routes.
    pub admin_token: Option<Arc<str>>,
}

impl AppState {
    pub fn new(storage: StorageService, admin_token: Option<String>) -> Self {
        let uploads = UploadService::new(Arc::new(storage.clone()));
        let ads = AdService::new(storage.db.clone());
        Self {
            storage,
            uploads,
            ads,
            admin_token: admin_token.map(Arc::from),
        }
    }
}
