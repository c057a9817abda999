pub mod cast;
pub mod concat;
pub mod interleave;
