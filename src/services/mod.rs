pub mod auth;
pub mod import;
pub mod token;

pub use token::{Claims, TokenSigner};
