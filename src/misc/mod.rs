pub mod byte_cursor;
pub mod byte_writer;
pub mod chunk_iterator;
pub mod tag;
