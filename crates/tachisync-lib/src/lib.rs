pub mod error;
pub mod extensions;
pub mod models;
pub mod prelude;
pub mod traits;

/// This is used to tag requests and logs with the library version
pub static LIB_VERSION: &str = env!("CARGO_PKG_VERSION");
