pub mod session;
pub mod social;

pub use session::{login, logout, refresh};
pub use social::{oauth_authorize, oauth_callback};
