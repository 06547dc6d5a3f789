pub mod media_gate;
pub mod naming;
pub mod readiness;
pub mod storage_service;
