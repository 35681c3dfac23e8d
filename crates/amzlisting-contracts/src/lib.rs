pub mod commands;
pub mod events;
pub mod image;
pub mod listing;
pub mod models;
