pub mod proxy_bridge;
pub mod virtual_file;

pub(crate) mod registry;
pub(crate) mod request;
pub(crate) mod worker;
