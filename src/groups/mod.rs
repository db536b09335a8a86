mod routes;
mod services;

pub use routes::routes;
pub use services::{add_member, create_group, load_group, remove_member, Removal};
