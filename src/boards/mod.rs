mod api;
mod routes;
mod services;

pub use api::{openapi, ApiDoc, MoveCardRequest, MoveCardResponse};
pub use routes::routes;
pub use services::{move_card, CardForm};
