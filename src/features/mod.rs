pub mod storage;
pub mod wallet;
