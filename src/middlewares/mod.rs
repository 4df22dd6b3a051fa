pub mod admin_guard;
pub mod cors;

pub use admin_guard::*;
pub use cors::*;
