pub mod config;
pub mod imap;
pub mod mail;
pub mod proto;
pub mod registry;
pub mod server;
pub mod smtp;
pub mod storage;
