mod audio_upload_service;
mod wallet_service;

pub use audio_upload_service::*;
pub use wallet_service::*;
