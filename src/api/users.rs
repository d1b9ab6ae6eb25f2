use log::info;
use warp::{filters::BoxedFilter, http::StatusCode, reply::Response, Filter, Rejection};

use super::context::{json_body, json_reply, no_content, query_pairs, with_context, Context};
use crate::{
    actions::{fetch_profiles, fetch_subscriptions, follow, get_profile, register_user, unfollow},
    error::ApiError,
    form::UserForm,
    jwt::SessionData,
    middleware::{with_possible_session, with_session},
    pagination::Page,
    permissions::ActionType,
    schema::Id,
};

pub fn routes(context: Context) -> BoxedFilter<(Response,)> {
    let secret = context.secret.clone();

    let list = warp::path!("api" / "users")
        .and(warp::get())
        .and(with_possible_session(secret.clone()))
        .and(query_pairs())
        .and(with_context(context.clone()))
        .and_then(handle_list_users);

    let register = warp::path!("api" / "users")
        .and(warp::post())
        .and(json_body::<UserForm>())
        .and(with_context(context.clone()))
        .and_then(handle_register);

    let me = warp::path!("api" / "users" / "me")
        .and(warp::get())
        .and(with_session(secret.clone()))
        .and(with_context(context.clone()))
        .and_then(handle_me);

    let subscriptions = warp::path!("api" / "users" / "subscriptions")
        .and(warp::get())
        .and(with_session(secret.clone()))
        .and(query_pairs())
        .and(with_context(context.clone()))
        .and_then(handle_subscriptions);

    let profile = warp::path!("api" / "users" / Id)
        .and(warp::get())
        .and(with_possible_session(secret.clone()))
        .and(with_context(context.clone()))
        .and_then(handle_profile);

    let subscribe = warp::path!("api" / "users" / Id / "subscribe")
        .and(warp::post())
        .and(with_session(secret.clone()))
        .and(query_pairs())
        .and(with_context(context.clone()))
        .and_then(handle_subscribe);

    let unsubscribe = warp::path!("api" / "users" / Id / "subscribe")
        .and(warp::delete())
        .and(with_session(secret))
        .and(with_context(context))
        .and_then(handle_unsubscribe);

    list.or(register)
        .unify()
        .or(me)
        .unify()
        .or(subscriptions)
        .unify()
        .or(profile)
        .unify()
        .or(subscribe)
        .unify()
        .or(unsubscribe)
        .unify()
        .boxed()
}

fn recipes_limit(query: &[(String, String)]) -> Result<Option<i64>, ApiError> {
    query
        .iter()
        .find(|(key, _)| key == "recipes_limit")
        .map(|(_, value)| {
            value
                .parse::<i64>()
                .ok()
                .filter(|limit| *limit >= 0)
                .ok_or_else(|| ApiError::validation("Invalid value for recipes_limit"))
        })
        .transpose()
}

async fn handle_list_users(
    viewer: Option<SessionData>,
    query: Vec<(String, String)>,
    context: Context,
) -> Result<Response, Rejection> {
    let page = Page::from_query(&query, context.page_size)?;
    let profiles = fetch_profiles(viewer.map(|s| s.user_id), page, &context.pool).await?;

    Ok(json_reply(&profiles, StatusCode::OK))
}

async fn handle_register(form: UserForm, context: Context) -> Result<Response, Rejection> {
    form.validate()?;
    let profile = register_user(&form, &context.pool).await?;

    info!("Registered user {} ({})", profile.username, profile.id);
    Ok(json_reply(&profile, StatusCode::CREATED))
}

async fn handle_me(session: SessionData, context: Context) -> Result<Response, Rejection> {
    let profile = get_profile(Some(session.user_id), session.user_id, &context.pool)
        .await?
        .ok_or_else(|| ApiError::not_found("No user exists with specified id"))?;

    Ok(json_reply(&profile, StatusCode::OK))
}

async fn handle_subscriptions(
    session: SessionData,
    query: Vec<(String, String)>,
    context: Context,
) -> Result<Response, Rejection> {
    let page = Page::from_query(&query, context.page_size)?;
    let limit = recipes_limit(&query)?;
    let authors = fetch_subscriptions(session.user_id, page, limit, &context.pool).await?;

    Ok(json_reply(&authors, StatusCode::OK))
}

async fn handle_profile(
    id: Id,
    viewer: Option<SessionData>,
    context: Context,
) -> Result<Response, Rejection> {
    let profile = get_profile(viewer.map(|s| s.user_id), id, &context.pool)
        .await?
        .ok_or_else(|| ApiError::not_found("No user exists with specified id"))?;

    Ok(json_reply(&profile, StatusCode::OK))
}

async fn handle_subscribe(
    author_id: Id,
    session: SessionData,
    query: Vec<(String, String)>,
    context: Context,
) -> Result<Response, Rejection> {
    session.authenticate(ActionType::ManageOwnSubscriptions)?;
    let limit = recipes_limit(&query)?;
    let subscription = follow(session.user_id, author_id, limit, &context.pool).await?;

    info!("User {} subscribed to {author_id}", session.user_id);
    Ok(json_reply(&subscription, StatusCode::CREATED))
}

async fn handle_unsubscribe(
    author_id: Id,
    session: SessionData,
    context: Context,
) -> Result<Response, Rejection> {
    session.authenticate(ActionType::ManageOwnSubscriptions)?;
    unfollow(session.user_id, author_id, &context.pool).await?;

    info!("User {} unsubscribed from {author_id}", session.user_id);
    Ok(no_content())
}
