pub mod activity_handler;
pub mod upload_handler;
pub mod wallet_handler;

pub use activity_handler::*;
pub use upload_handler::*;
pub use wallet_handler::*;
