//! Cookie-based JWT sessions, bcrypt passwords and role guards.

pub mod extractor;
pub mod handlers;
pub mod password;
pub mod revocation;
pub mod token;
pub mod users;

pub use extractor::AuthUser;
pub use token::TokenKeys;
