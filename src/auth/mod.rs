mod credentials;
mod middlewares;
mod routes;
mod services;

pub use credentials::{hash_password, verify_password};
pub use middlewares::{login_required_middleware, sessions_middleware, Principal};
pub use routes::routes;
pub use services::{authenticate, login_redirect, register, IngressForm};
