pub mod chapter_recognition;
pub mod chapter_sync;
pub mod favorites_storage;
pub mod fetch_interval;
pub mod gallery_adder;
pub mod throttle;
