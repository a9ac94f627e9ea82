pub mod chain;
pub mod header;
pub mod validator;

pub use chain::*;
pub use header::*;
pub use validator::*;
