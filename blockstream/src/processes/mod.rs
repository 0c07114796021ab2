pub mod running_hashes;
pub mod trailing_hashes;
