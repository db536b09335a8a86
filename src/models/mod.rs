mod board;
mod card;
mod group;
mod user;

pub use board::Board;
pub use card::{Card, CardStatus, NewCard};
pub use group::{Group, Member};
pub use user::User;
