mod api;
mod downloads;

pub use api::*;
pub use downloads::*;
