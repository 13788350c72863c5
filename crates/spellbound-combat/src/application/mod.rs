//! Application layer: persistence contracts and the handlers that run the
//! load → resolve → persist cycle for each entry point.

pub mod catalog_cache;
pub mod command_handlers;
pub mod locks;
pub mod ports;
pub mod query_handlers;
