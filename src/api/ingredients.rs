use warp::{filters::BoxedFilter, http::StatusCode, reply::Response, Filter, Rejection};

use super::context::{json_reply, query_pairs, with_context, Context};
use crate::{
    actions::{get_ingredient, list_ingredients},
    error::ApiError,
    schema::Id,
};

pub fn routes(context: Context) -> BoxedFilter<(Response,)> {
    let list = warp::path!("api" / "ingredients")
        .and(warp::get())
        .and(query_pairs())
        .and(with_context(context.clone()))
        .and_then(handle_list_ingredients);

    let retrieve = warp::path!("api" / "ingredients" / Id)
        .and(warp::get())
        .and(with_context(context))
        .and_then(handle_get_ingredient);

    list.or(retrieve).unify().boxed()
}

async fn handle_list_ingredients(
    query: Vec<(String, String)>,
    context: Context,
) -> Result<Response, Rejection> {
    let search = query
        .iter()
        .find(|(key, _)| key == "name")
        .map(|(_, value)| value.as_str());
    let ingredients = list_ingredients(search, &context.pool).await?;

    Ok(json_reply(&ingredients, StatusCode::OK))
}

async fn handle_get_ingredient(id: Id, context: Context) -> Result<Response, Rejection> {
    let ingredient = get_ingredient(id, &context.pool)
        .await?
        .ok_or_else(|| ApiError::not_found("No ingredient exists with specified id"))?;

    Ok(json_reply(&ingredient, StatusCode::OK))
}
