//! linebot core library: LINE webhook types and signature check, the event
//! dispatcher, and the HTTP gateway used by the CLI.

pub mod channels;
pub mod config;
pub mod dispatch;
pub mod gateway;
pub mod store;
