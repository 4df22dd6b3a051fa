pub mod allocations;
pub mod items;
pub mod meta;
pub mod participants;
pub mod runs;
pub mod votes;

pub use allocations as allocation_entity;
pub use items as item_entity;
pub use meta as meta_entity;
pub use participants as participant_entity;
pub use runs as run_entity;
pub use votes as vote_entity;
