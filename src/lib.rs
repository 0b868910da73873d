pub mod command;
pub mod config;
pub mod contact;
pub mod controller;
pub mod error;
pub mod shell;
pub mod store;
pub mod transfer;
pub mod web;

pub const NAME: &str = "contact-book";
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
