//! HTTP resource groups. Each module is a stateless set of handlers
//! performing direct reads/writes against the persistence layer.

pub mod challenges;
pub mod chats;
pub mod coach;
pub mod habits;
pub mod partners;
pub mod users;

use std::sync::Arc;

use axum::Router;

use crate::AppState;

pub fn api_router() -> Router<Arc<AppState>> {
    Router::new()
        .nest("/habits", habits::router())
        .nest("/users", users::router())
        .nest("/partners", partners::router())
        .nest("/challenges", challenges::router())
        .nest("/coach", coach::router())
        .nest("/chats", chats::router())
}
