pub mod projection;
pub mod record;
pub mod schema;

pub use projection::*;
pub use record::*;
pub use schema::*;
