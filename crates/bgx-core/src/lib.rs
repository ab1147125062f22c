pub mod config;
pub mod error;
pub mod logging;

// Components, leaf first.
pub mod permission;
pub mod platform;
pub mod background;
pub mod notification;
pub mod lifecycle;
pub mod transfer;
