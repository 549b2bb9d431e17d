pub mod http;
pub mod slack;
