use std::sync::Arc;
use tracing::info;

use crate::core::config::{EnvLookup, StorageInfo, StorageKind};
use crate::features::storage::dtos::{
    StorageGuideResponseDto, StorageInfoResponseDto, StorageResetResponseDto,
};
use crate::modules::storage::{
    configuration_guide, StorageFactory, TestUploadReport, TosConfigValidator, ValidationReport,
};

/// Operator diagnostics over the storage configuration and the cached adapter
pub struct StorageService {
    factory: Arc<StorageFactory>,
    lookup: EnvLookup,
}

impl StorageService {
    pub fn new(factory: Arc<StorageFactory>, lookup: EnvLookup) -> Self {
        Self { factory, lookup }
    }

    fn validator(&self) -> TosConfigValidator {
        TosConfigValidator::new(Arc::clone(&self.lookup))
    }

    pub async fn validate(&self) -> ValidationReport {
        let report = self.validator().validate_configuration().await;
        info!(
            "Storage configuration validated: valid={}, errors={}, warnings={}",
            report.is_valid,
            report.errors.len(),
            report.warnings.len()
        );
        report
    }

    pub async fn test_upload(&self) -> TestUploadReport {
        let report = self.validator().test_upload().await;
        info!("Storage upload test finished: success={}", report.success);
        report
    }

    pub async fn info(&self) -> StorageInfoResponseDto {
        let StorageInfo {
            provider,
            bucket_name,
            region,
            endpoint,
        } = StorageInfo::from_lookup(&self.lookup);

        StorageInfoResponseDto {
            provider,
            bucket_name,
            region,
            endpoint,
            active_provider: self
                .factory
                .current()
                .await
                .map(|backend| backend.name().to_string()),
        }
    }

    /// Drop the cached adapter so the next upload re-reads configuration
    pub async fn reset(&self) -> StorageResetResponseDto {
        let was_cached = self.factory.current().await.is_some();
        self.factory.reset().await;

        StorageResetResponseDto {
            was_cached,
            next_provider: StorageKind::parse((self.lookup)("STORAGE_PROVIDER").as_deref()),
        }
    }

    pub fn guide(&self) -> StorageGuideResponseDto {
        StorageGuideResponseDto {
            steps: configuration_guide()
                .into_iter()
                .map(|step| step.to_string())
                .collect(),
        }
    }
}
