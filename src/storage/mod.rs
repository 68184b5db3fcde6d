//! Storage layer: fixed-size page IO on disk.
//!
//! A page file keeps a header page with the user-page count in front of
//! the user pages; everything above this layer addresses pages by their
//! user-page number only.

mod page_file;

pub use page_file::PageFile;
