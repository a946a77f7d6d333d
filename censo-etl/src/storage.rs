//! Google Cloud Storage client for the upload stage.
//!
//! The store is authenticated with the service-account JSON file named in
//! [`PipelineConfig::credentials_path`] and bound to the destination bucket.
//! Building it only parses the credentials; whether the bucket exists is
//! checked by the uploader before the first write.

use std::sync::Arc;

use censo_etl_core::config::PipelineConfig;
use censo_etl_core::error::UploadError;
use object_store::gcp::GoogleCloudStorageBuilder;
use object_store::ObjectStore;

pub fn build_store(config: &PipelineConfig) -> Result<Arc<dyn ObjectStore>, UploadError> {
    let credentials = config.credentials_path.to_string_lossy().into_owned();
    match GoogleCloudStorageBuilder::new()
        .with_bucket_name(&config.bucket)
        .with_service_account_path(credentials)
        .build()
    {
        Ok(store) => {
            tracing::info!(
                bucket = %config.bucket,
                credentials_path = %config.credentials_path.display(),
                "Initialized Google Cloud Storage client"
            );
            Ok(Arc::new(store))
        }
        Err(e) => {
            tracing::error!(
                error = %e,
                credentials_path = %config.credentials_path.display(),
                "Failed to initialize Google Cloud Storage client"
            );
            Err(UploadError::Client(e))
        }
    }
}
