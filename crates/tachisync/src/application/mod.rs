pub mod favorites_sync;
pub mod worker;
