pub mod hashed;
pub mod http;
