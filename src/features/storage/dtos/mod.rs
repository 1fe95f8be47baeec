mod storage_dto;

pub use storage_dto::*;
