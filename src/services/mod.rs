pub mod draw_service;
pub mod item_service;
pub mod meta_service;
pub mod participant_service;
pub mod vote_service;

pub use draw_service::*;
pub use item_service::*;
pub use meta_service::*;
pub use participant_service::*;
pub use vote_service::*;

use std::sync::Arc;
use tokio::sync::Mutex;

/// Serializes draws, clears, imports and participant deletes.
pub type AdminLock = Arc<Mutex<()>>;
