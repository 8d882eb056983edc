pub mod catalog;
pub mod classify;
pub mod client;
pub mod config;
pub mod error;
pub mod feed;
pub mod fetch;
pub mod format;
pub mod notification;
pub mod notifier;
pub mod phrase;
pub mod platform;
pub mod posts;
pub mod protocol;
pub mod schedule;
pub mod state;
