pub mod app;
pub mod bot;
pub mod channels;
pub mod config;
pub mod conversation;
pub mod knowledge;
pub mod persona;
pub mod provider;
pub mod scenario;
pub mod shared;
pub mod tools;
