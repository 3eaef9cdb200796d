mod resolve;
mod schema;

pub use resolve::*;
pub use schema::*;
