mod activity_dto;
mod upload_dto;
mod wallet_dto;

pub use activity_dto::*;
pub use upload_dto::*;
pub use wallet_dto::*;
