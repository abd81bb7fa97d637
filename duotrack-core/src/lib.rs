pub mod common;
pub mod debounce;
pub mod error;
pub mod geo;
pub mod rating;
pub mod reconcile;
pub mod users;

pub use error::{Error, Notice, Result};
pub use rating::{FillState, Rating, Ratings, StarIndex};
pub use users::{ActiveUser, UserId};
