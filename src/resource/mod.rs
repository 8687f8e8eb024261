pub mod cache;
pub mod decoders;
pub mod descriptor;
pub mod detection;
pub mod index;
pub mod locator;
pub mod resource_manager;
pub mod room;
pub mod storage;
