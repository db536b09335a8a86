mod routes;
mod services;

pub use routes::routes;
pub use services::{update_profile, Avatar, ProfileUpdate};
