//! Object storage for recorded audio
//!
//! One contract (`StorageProvider` + `StorageInspector`) with two adapters,
//! Supabase Storage and Volcengine TOS, selected and cached by
//! [`StorageFactory`].

mod batch;
mod error;
mod factory;
mod provider;
mod supabase;
mod tos;
mod tos_signer;
mod types;
mod validator;

pub use batch::{upload_with_retry, Pacer, RetryPolicy, TokioPacer};
pub use error::StorageError;
pub use factory::StorageFactory;
pub use types::UploadFile;
pub use validator::{configuration_guide, TestUploadReport, TosConfigValidator, ValidationReport};

#[cfg(test)]
pub(crate) use batch::tests::RecordingPacer;
