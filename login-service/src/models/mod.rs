pub mod credential;
pub mod login;

pub use credential::CredentialRecord;
pub use login::{IssuedToken, LoginRequest, LOGIN_ACTION};
