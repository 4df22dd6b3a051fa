pub mod admin;
pub mod item;
pub mod participant;
pub mod results;

pub use admin::admin_config;
pub use item::item_config;
pub use participant::participant_config;
pub use results::results_config;
