pub mod xxhash;

pub use xxhash::{contents_equal, hash_file, CompareError};
