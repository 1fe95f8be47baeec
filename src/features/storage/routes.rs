use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;

use crate::features::storage::handlers::{
    get_storage_guide, get_storage_info, reset_storage, test_storage, validate_storage,
};
use crate::features::storage::services::StorageService;

pub fn routes(service: Arc<StorageService>) -> Router {
    Router::new()
        .route("/api/storage/validate", post(validate_storage))
        .route("/api/storage/test", post(test_storage))
        .route("/api/storage/info", get(get_storage_info))
        .route("/api/storage/reset", post(reset_storage))
        .route("/api/storage/guide", get(get_storage_guide))
        .with_state(service)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::{EnvLookup, StorageConfig};
    use crate::modules::storage::StorageFactory;
    use crate::shared::test_helpers::map_lookup;
    use axum_test::TestServer;
    use serde_json::Value;

    fn server(lookup: EnvLookup) -> (TestServer, Arc<StorageFactory>) {
        let loader_lookup = Arc::clone(&lookup);
        let factory = Arc::new(StorageFactory::new(Arc::new(move || {
            StorageConfig::from_lookup(&loader_lookup)
        })));
        let service = Arc::new(StorageService::new(Arc::clone(&factory), lookup));
        (TestServer::new(routes(service)).unwrap(), factory)
    }

    fn tos_lookup() -> EnvLookup {
        map_lookup(&[
            ("STORAGE_PROVIDER", "tos"),
            ("TOS_REGION", "cn-beijing"),
            ("TOS_ACCESS_KEY_ID", "ak"),
            ("TOS_ACCESS_KEY_SECRET", "sk"),
            ("TOS_BUCKET_NAME", "voices"),
        ])
    }

    #[tokio::test]
    async fn test_validate_reports_missing_keys() {
        let (server, _) = server(map_lookup(&[]));

        let response = server.post("/api/storage/validate").await;
        response.assert_status_ok();

        let body: Value = response.json();
        assert_eq!(body["isValid"], false);
        assert_eq!(body["errors"].as_array().unwrap().len(), 4);
        assert_eq!(body["warnings"], serde_json::json!([]));
    }

    #[tokio::test]
    async fn test_validate_with_complete_tos_configuration() {
        let (server, _) = server(tos_lookup());

        let body: Value = server.post("/api/storage/validate").await.json();
        assert_eq!(body["isValid"], true);
        assert_eq!(body["info"]["bucketExists"], true);
    }

    #[tokio::test]
    async fn test_storage_test_without_credentials_fails_in_body() {
        let (server, _) = server(map_lookup(&[]));

        let response = server.post("/api/storage/test").await;
        response.assert_status_ok();

        let body: Value = response.json();
        assert_eq!(body["success"], false);
        assert!(body.get("details").is_none());
    }

    #[tokio::test]
    async fn test_info_and_reset_track_cached_adapter() {
        let (server, factory) = server(tos_lookup());

        let body: Value = server.get("/api/storage/info").await.json();
        assert_eq!(body["data"]["provider"], "tos");
        assert_eq!(body["data"]["bucketName"], "voices");
        assert!(body["data"]["activeProvider"].is_null());

        factory.get().await.unwrap();
        let body: Value = server.get("/api/storage/info").await.json();
        assert_eq!(body["data"]["activeProvider"], "tos");

        let body: Value = server.post("/api/storage/reset").await.json();
        assert_eq!(body["data"]["wasCached"], true);
        assert_eq!(body["data"]["nextProvider"], "tos");
        assert!(factory.current().await.is_none());
    }

    #[tokio::test]
    async fn test_guide_lists_steps() {
        let (server, _) = server(map_lookup(&[]));

        let body: Value = server.get("/api/storage/guide").await.json();
        assert!(body["data"]["steps"].as_array().unwrap().len() >= 5);
    }
}
