//! Modules layer - adapters for external services
//!
//! Currently object storage for uploaded audio (Supabase Storage or Volcengine TOS).

pub mod storage;
