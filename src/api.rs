mod context;
mod ingredients;
mod recipes;
mod rejection;
mod tags;
mod users;

use std::convert::Infallible;

use warp::{Filter, Reply};

pub use context::Context;
pub use rejection::handle_rejection;

/// The full `/api` route tree with JSON error rendering and request logging.
pub fn routes(context: Context) -> impl Filter<Extract = impl Reply, Error = Infallible> + Clone {
    users::routes(context.clone())
        .or(tags::routes(context.clone()))
        .unify()
        .or(ingredients::routes(context.clone()))
        .unify()
        .or(recipes::routes(context))
        .unify()
        .recover(handle_rejection)
        .with(warp::log("foodgram::api"))
}
