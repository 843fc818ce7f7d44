pub mod media_source;
pub mod proxy_delegate;
pub mod proxy_handler;
