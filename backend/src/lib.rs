pub mod api;
pub mod archive;
pub mod bot;
pub mod broadcast;
pub mod clock;
pub mod config;
pub mod directory;
pub mod error;
pub mod history;
pub mod rating;
pub mod session;
pub mod ws;
