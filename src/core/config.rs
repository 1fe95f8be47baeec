use serde::Serialize;
use std::env;
use std::sync::Arc;
use utoipa::ToSchema;

use crate::modules::storage::{RetryPolicy, StorageError};

/// Key lookup used to read configuration.
///
/// Production code reads the process environment; tests pass a fixed map so
/// they never mutate global state.
pub type EnvLookup = Arc<dyn Fn(&str) -> Option<String> + Send + Sync>;

/// Lookup over the process environment. Empty values count as unset.
pub fn process_env() -> EnvLookup {
    Arc::new(|key: &str| env::var(key).ok().filter(|v| !v.trim().is_empty()))
}

#[derive(Debug, Clone)]
pub struct Config {
    pub app: AppConfig,
    pub database: DatabaseConfig,
    pub upload: UploadConfig,
    pub swagger: SwaggerConfig,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub cors_allowed_origins: Vec<String>,
    pub max_request_body_size: usize,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub acquire_timeout_secs: u64,
    pub idle_timeout_secs: u64,
    pub max_lifetime_secs: u64,
}

#[derive(Debug, Clone)]
pub struct SwaggerConfig {
    pub title: String,
    pub version: String,
    pub description: String,
}

/// Settings for the audio upload flow
#[derive(Debug, Clone)]
pub struct UploadConfig {
    /// Attempts per audio upload (1 = no retry)
    pub max_attempts: u32,
}

impl Config {
    pub fn from_env() -> Result<Self, String> {
        // Load .env file if exists, ignore if not found (optional for production)
        if let Err(e) = dotenvy::dotenv() {
            if !e.to_string().contains("not found") {
                eprintln!("Warning: Error loading .env file: {}", e);
            }
        }

        Ok(Config {
            app: AppConfig::from_env()?,
            database: DatabaseConfig::from_env()?,
            upload: UploadConfig::from_env()?,
            swagger: SwaggerConfig::from_env()?,
        })
    }
}

impl AppConfig {
    const DEFAULT_MAX_REQUEST_BODY_SIZE: usize = 12 * 1024 * 1024; // 12MB

    pub fn from_env() -> Result<Self, String> {
        let host = env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse::<u16>()
            .map_err(|e| format!("Invalid PORT: {}", e))?;

        let cors_allowed_origins = env::var("CORS_ALLOWED_ORIGINS")
            .unwrap_or_else(|_| "*".to_string())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let max_request_body_size = env::var("MAX_REQUEST_BODY_SIZE")
            .unwrap_or_else(|_| Self::DEFAULT_MAX_REQUEST_BODY_SIZE.to_string())
            .parse::<usize>()
            .map_err(|_| "MAX_REQUEST_BODY_SIZE must be a valid number".to_string())?;

        Ok(Self {
            host,
            port,
            cors_allowed_origins,
            max_request_body_size,
        })
    }

    pub fn server_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl DatabaseConfig {
    const DEFAULT_MAX_CONNECTIONS: u32 = 10;
    const DEFAULT_MIN_CONNECTIONS: u32 = 1;
    const DEFAULT_ACQUIRE_TIMEOUT_SECS: u64 = 5;
    const DEFAULT_IDLE_TIMEOUT_SECS: u64 = 600; // 10 minutes
    const DEFAULT_MAX_LIFETIME_SECS: u64 = 1800; // 30 minutes

    pub fn from_env() -> Result<Self, String> {
        let url = env::var("DATABASE_URL").map_err(|_| "DATABASE_URL must be set".to_string())?;

        let max_connections = env::var("DB_MAX_CONNECTIONS")
            .unwrap_or_else(|_| Self::DEFAULT_MAX_CONNECTIONS.to_string())
            .parse::<u32>()
            .map_err(|_| "DB_MAX_CONNECTIONS must be a valid number".to_string())?;

        let min_connections = env::var("DB_MIN_CONNECTIONS")
            .unwrap_or_else(|_| Self::DEFAULT_MIN_CONNECTIONS.to_string())
            .parse::<u32>()
            .map_err(|_| "DB_MIN_CONNECTIONS must be a valid number".to_string())?;

        let acquire_timeout_secs = env::var("DB_ACQUIRE_TIMEOUT_SECS")
            .unwrap_or_else(|_| Self::DEFAULT_ACQUIRE_TIMEOUT_SECS.to_string())
            .parse::<u64>()
            .map_err(|_| "DB_ACQUIRE_TIMEOUT_SECS must be a valid number".to_string())?;

        let idle_timeout_secs = env::var("DB_IDLE_TIMEOUT_SECS")
            .unwrap_or_else(|_| Self::DEFAULT_IDLE_TIMEOUT_SECS.to_string())
            .parse::<u64>()
            .map_err(|_| "DB_IDLE_TIMEOUT_SECS must be a valid number".to_string())?;

        let max_lifetime_secs = env::var("DB_MAX_LIFETIME_SECS")
            .unwrap_or_else(|_| Self::DEFAULT_MAX_LIFETIME_SECS.to_string())
            .parse::<u64>()
            .map_err(|_| "DB_MAX_LIFETIME_SECS must be a valid number".to_string())?;

        Ok(Self {
            url,
            max_connections,
            min_connections,
            acquire_timeout_secs,
            idle_timeout_secs,
            max_lifetime_secs,
        })
    }
}

impl UploadConfig {
    const DEFAULT_MAX_ATTEMPTS: u32 = 1;

    pub fn from_env() -> Result<Self, String> {
        let max_attempts = env::var("STORAGE_UPLOAD_MAX_ATTEMPTS")
            .unwrap_or_else(|_| Self::DEFAULT_MAX_ATTEMPTS.to_string())
            .parse::<u32>()
            .map_err(|_| "STORAGE_UPLOAD_MAX_ATTEMPTS must be a valid number".to_string())?;

        Ok(Self { max_attempts })
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::attempts(self.max_attempts)
    }
}

impl SwaggerConfig {
    pub fn from_env() -> Result<Self, String> {
        let title = env::var("SWAGGER_TITLE").unwrap_or_else(|_| "Yue Voice API".to_string());
        let version =
            env::var("SWAGGER_VERSION").unwrap_or_else(|_| env!("CARGO_PKG_VERSION").to_string());
        let description = env::var("SWAGGER_DESCRIPTION")
            .unwrap_or_else(|_| "API documentation for Yue Voice".to_string());

        Ok(Self {
            title,
            version,
            description,
        })
    }
}

// =============================================================================
// STORAGE
// =============================================================================

/// Which object storage backend is in use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum StorageKind {
    Supabase,
    Tos,
}

impl StorageKind {
    /// Anything other than "tos" selects Supabase
    pub fn parse(value: Option<&str>) -> Self {
        match value.map(|v| v.trim().to_ascii_lowercase()).as_deref() {
            Some("tos") => StorageKind::Tos,
            _ => StorageKind::Supabase,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            StorageKind::Supabase => "supabase",
            StorageKind::Tos => "tos",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SupabaseStorageSettings {
    pub url: String,
    pub anon_key: String,
    pub bucket: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TosStorageSettings {
    pub region: String,
    pub access_key_id: String,
    pub access_key_secret: String,
    pub bucket: String,
    pub endpoint: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageSettings {
    Supabase(SupabaseStorageSettings),
    Tos(TosStorageSettings),
}

/// Storage backend selection plus its settings, read once per factory fill
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageConfig {
    pub provider: StorageKind,
    pub settings: StorageSettings,
}

/// Marker of S3-compatible TOS endpoints (`tos-s3-cn-beijing.volces.com`)
pub const TOS_S3_MARKER: &str = "tos-s3-";

impl StorageConfig {
    pub const DEFAULT_SUPABASE_BUCKET: &'static str = "audio-recordings";
    pub const DEFAULT_TOS_REGION: &'static str = "cn-beijing";
    pub const DEFAULT_TOS_BUCKET: &'static str = "yue-voice-audio";

    pub fn from_env() -> Result<Self, StorageError> {
        Self::from_lookup(&process_env())
    }

    /// Build the storage configuration from a key lookup.
    ///
    /// Missing credentials are left empty here; the adapter rejects them at
    /// construction time.
    pub fn from_lookup(lookup: &EnvLookup) -> Result<Self, StorageError> {
        let provider = StorageKind::parse(lookup("STORAGE_PROVIDER").as_deref());

        let settings = match provider {
            StorageKind::Tos => StorageSettings::Tos(TosStorageSettings {
                region: lookup("TOS_REGION")
                    .unwrap_or_else(|| Self::DEFAULT_TOS_REGION.to_string()),
                access_key_id: lookup("TOS_ACCESS_KEY_ID").unwrap_or_default(),
                access_key_secret: lookup("TOS_ACCESS_KEY_SECRET").unwrap_or_default(),
                bucket: lookup("TOS_BUCKET_NAME")
                    .unwrap_or_else(|| Self::DEFAULT_TOS_BUCKET.to_string()),
                endpoint: lookup("TOS_ENDPOINT").map(|e| rewrite_s3_endpoint(&e)),
            }),
            StorageKind::Supabase => StorageSettings::Supabase(SupabaseStorageSettings {
                url: lookup("SUPABASE_URL").unwrap_or_default(),
                anon_key: lookup("SUPABASE_ANON_KEY").unwrap_or_default(),
                bucket: lookup("SUPABASE_BUCKET")
                    .unwrap_or_else(|| Self::DEFAULT_SUPABASE_BUCKET.to_string()),
            }),
        };

        Ok(Self { provider, settings })
    }
}

/// Rewrite an S3-compatible TOS endpoint into the TOS-native form.
///
/// NOTE: `TosStorage::new` rejects the same marker outright. Only this loader
/// rewrites it, so adapters built directly (the configuration validator does
/// this) still fail on an S3-style `TOS_ENDPOINT`. Both behaviors are kept on
/// purpose until it is decided which one is authoritative.
pub fn rewrite_s3_endpoint(endpoint: &str) -> String {
    if endpoint.contains(TOS_S3_MARKER) {
        let rewritten = endpoint.replace(TOS_S3_MARKER, "tos-");
        tracing::info!(
            "Rewrote S3-compatible TOS endpoint: {} -> {}",
            endpoint,
            rewritten
        );
        rewritten
    } else {
        endpoint.to_string()
    }
}

/// Operator-facing summary of the configured storage backend
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StorageInfo {
    pub provider: StorageKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bucket_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
}

impl StorageInfo {
    /// Raw values as configured, without defaults or endpoint rewriting
    pub fn from_lookup(lookup: &EnvLookup) -> Self {
        match StorageKind::parse(lookup("STORAGE_PROVIDER").as_deref()) {
            StorageKind::Tos => Self {
                provider: StorageKind::Tos,
                bucket_name: lookup("TOS_BUCKET_NAME"),
                region: lookup("TOS_REGION"),
                endpoint: lookup("TOS_ENDPOINT"),
            },
            StorageKind::Supabase => Self {
                provider: StorageKind::Supabase,
                bucket_name: Some(
                    lookup("SUPABASE_BUCKET")
                        .unwrap_or_else(|| StorageConfig::DEFAULT_SUPABASE_BUCKET.to_string()),
                ),
                region: None,
                endpoint: None,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::test_helpers::map_lookup;

    #[test]
    fn test_storage_kind_parse() {
        assert_eq!(StorageKind::parse(Some("tos")), StorageKind::Tos);
        assert_eq!(StorageKind::parse(Some(" TOS ")), StorageKind::Tos);
        assert_eq!(StorageKind::parse(Some("supabase")), StorageKind::Supabase);
        assert_eq!(StorageKind::parse(Some("s3")), StorageKind::Supabase);
        assert_eq!(StorageKind::parse(None), StorageKind::Supabase);
    }

    #[test]
    fn test_default_provider_is_supabase() {
        let lookup = map_lookup(&[
            ("SUPABASE_URL", "https://proj.supabase.co"),
            ("SUPABASE_ANON_KEY", "anon"),
        ]);
        let config = StorageConfig::from_lookup(&lookup).unwrap();

        assert_eq!(config.provider, StorageKind::Supabase);
        assert_eq!(
            config.settings,
            StorageSettings::Supabase(SupabaseStorageSettings {
                url: "https://proj.supabase.co".to_string(),
                anon_key: "anon".to_string(),
                bucket: "audio-recordings".to_string(),
            })
        );
    }

    #[test]
    fn test_tos_defaults_and_endpoint_rewrite() {
        let lookup = map_lookup(&[
            ("STORAGE_PROVIDER", "tos"),
            ("TOS_ACCESS_KEY_ID", "ak"),
            ("TOS_ACCESS_KEY_SECRET", "sk"),
            ("TOS_ENDPOINT", "https://tos-s3-cn-guangzhou.volces.com"),
        ]);
        let config = StorageConfig::from_lookup(&lookup).unwrap();

        match config.settings {
            StorageSettings::Tos(tos) => {
                assert_eq!(tos.region, "cn-beijing");
                assert_eq!(tos.bucket, "yue-voice-audio");
                assert_eq!(
                    tos.endpoint.as_deref(),
                    Some("https://tos-cn-guangzhou.volces.com")
                );
            }
            other => panic!("expected TOS settings, got {:?}", other),
        }
    }

    #[test]
    fn test_rewrite_leaves_native_endpoint_alone() {
        assert_eq!(
            rewrite_s3_endpoint("tos-cn-beijing.volces.com"),
            "tos-cn-beijing.volces.com"
        );
    }

    #[test]
    fn test_storage_info_reports_raw_tos_values() {
        let lookup = map_lookup(&[
            ("STORAGE_PROVIDER", "tos"),
            ("TOS_BUCKET_NAME", "voices"),
            ("TOS_ENDPOINT", "https://tos-s3-cn-beijing.volces.com"),
        ]);
        let info = StorageInfo::from_lookup(&lookup);

        assert_eq!(info.provider, StorageKind::Tos);
        assert_eq!(info.bucket_name.as_deref(), Some("voices"));
        assert_eq!(info.region, None);
        assert_eq!(
            info.endpoint.as_deref(),
            Some("https://tos-s3-cn-beijing.volces.com")
        );
    }

    #[test]
    fn test_storage_info_for_supabase() {
        let info = StorageInfo::from_lookup(&map_lookup(&[]));
        assert_eq!(info.provider, StorageKind::Supabase);
        assert_eq!(info.bucket_name.as_deref(), Some("audio-recordings"));
    }
}
