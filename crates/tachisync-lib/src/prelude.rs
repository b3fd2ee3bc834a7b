pub use crate::error::Error;
pub use crate::extensions::SourceRegistry;
pub use crate::models::*;
pub use crate::traits::Source;
