pub mod context;
pub mod error;

pub use context::{AppContext, Settings};
pub use error::{ConfluenceError, Result};
