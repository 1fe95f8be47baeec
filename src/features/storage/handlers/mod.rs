pub mod storage_handler;

pub use storage_handler::*;
