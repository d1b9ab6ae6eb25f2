use log::info;
use warp::{filters::BoxedFilter, http::StatusCode, reply::Response, Filter, Rejection};

use super::context::{json_body, json_reply, no_content, with_context, Context};
use crate::{
    actions::{create_tag, delete_tag, get_tag, list_tags, update_tag},
    error::ApiError,
    form::{TagForm, TagPatch},
    jwt::SessionData,
    middleware::with_session,
    permissions::ActionType,
    schema::Id,
};

pub fn routes(context: Context) -> BoxedFilter<(Response,)> {
    let secret = context.secret.clone();

    let list = warp::path!("api" / "tags")
        .and(warp::get())
        .and(with_context(context.clone()))
        .and_then(handle_list_tags);

    let create = warp::path!("api" / "tags")
        .and(warp::post())
        .and(with_session(secret.clone()))
        .and(json_body::<TagForm>())
        .and(with_context(context.clone()))
        .and_then(handle_create_tag);

    let retrieve = warp::path!("api" / "tags" / Id)
        .and(warp::get())
        .and(with_context(context.clone()))
        .and_then(handle_get_tag);

    let update = warp::path!("api" / "tags" / Id)
        .and(warp::patch())
        .and(with_session(secret.clone()))
        .and(json_body::<TagPatch>())
        .and(with_context(context.clone()))
        .and_then(handle_update_tag);

    let delete = warp::path!("api" / "tags" / Id)
        .and(warp::delete())
        .and(with_session(secret))
        .and(with_context(context))
        .and_then(handle_delete_tag);

    list.or(create)
        .unify()
        .or(retrieve)
        .unify()
        .or(update)
        .unify()
        .or(delete)
        .unify()
        .boxed()
}

async fn handle_list_tags(context: Context) -> Result<Response, Rejection> {
    let tags = list_tags(&context.pool).await?;
    Ok(json_reply(&tags, StatusCode::OK))
}

async fn handle_create_tag(
    session: SessionData,
    form: TagForm,
    context: Context,
) -> Result<Response, Rejection> {
    session.authenticate(ActionType::ManageTags)?;
    let form = form.normalize()?;
    let tag = create_tag(&form, &context.pool).await?;

    info!("Created tag {} ({})", tag.slug, tag.id);
    Ok(json_reply(&tag, StatusCode::CREATED))
}

async fn handle_get_tag(id: Id, context: Context) -> Result<Response, Rejection> {
    let tag = get_tag(id, &context.pool)
        .await?
        .ok_or_else(|| ApiError::not_found("No tag exists with specified id"))?;

    Ok(json_reply(&tag, StatusCode::OK))
}

async fn handle_update_tag(
    id: Id,
    session: SessionData,
    patch: TagPatch,
    context: Context,
) -> Result<Response, Rejection> {
    session.authenticate(ActionType::ManageTags)?;
    let patch = patch.normalize()?;
    let tag = update_tag(id, &patch, &context.pool).await?;

    Ok(json_reply(&tag, StatusCode::OK))
}

async fn handle_delete_tag(
    id: Id,
    session: SessionData,
    context: Context,
) -> Result<Response, Rejection> {
    session.authenticate(ActionType::ManageTags)?;
    delete_tag(id, &context.pool).await?;

    info!("Deleted tag {id}");
    Ok(no_content())
}
