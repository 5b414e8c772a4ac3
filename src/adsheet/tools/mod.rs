pub mod alias;
pub mod directory;
pub mod error;
pub mod headers;
pub mod io;
pub mod model;
pub mod rows;
pub mod sync;

pub use error::{Result, ToolError};
