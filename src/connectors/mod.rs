pub mod backend;
pub mod messages;
pub mod traits;
