mod admin_handlers;
mod dto;
mod error;
mod handlers;
mod router;

pub use admin_handlers::DEFAULT_USER_BALANCE;
pub use dto::*;
pub use error::ApiError;
pub use router::{Admin, AppState, Bots, Queries, Resolver, Trader, create_router};
