pub mod client;
pub mod config;
pub mod dtype;
pub mod error;
pub mod params;
pub mod proto;
pub mod request;
pub mod server;
pub mod tensor;
pub mod text_format;
