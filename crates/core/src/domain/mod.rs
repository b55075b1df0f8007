pub mod addon;
pub mod certification;
pub mod listing;
pub mod owner;
