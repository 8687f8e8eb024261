pub mod md5_engine;
pub mod xor;
