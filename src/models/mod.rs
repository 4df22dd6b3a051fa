pub mod draw;
pub mod item;
pub mod participant;
pub mod vote;

pub use draw::*;
pub use item::*;
pub use participant::*;
pub use vote::*;
