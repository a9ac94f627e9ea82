pub mod merkle;
pub mod patricia;

pub use merkle::*;
pub use patricia::*;
