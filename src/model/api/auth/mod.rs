mod request;
mod token;
mod user;

pub use request::{AuthResponse, Credentials, Registration};
pub use token::{AuthToken, AUTH_TOKEN_COOKIE};
pub use user::{Admin, AnyUser, Clearance, Voter};
