use log::info;
use warp::{
    filters::BoxedFilter,
    http::StatusCode,
    reply::{with_header, Response},
    Filter, Rejection, Reply,
};

use super::context::{json_body, json_reply, no_content, query_pairs, with_context, Context};
use crate::{
    actions::{
        add_mark, build_shopping_list, create_recipe, delete_recipe, fetch_recipes,
        get_recipe_detail, get_recipe_mut, remove_mark, update_recipe, MarkKind,
    },
    error::ApiError,
    filter::RecipeFilter,
    form::{RecipeForm, RecipePatch},
    jwt::SessionData,
    media::decode_data_uri,
    middleware::{with_possible_session, with_session},
    pagination::Page,
    permissions::ActionType,
    schema::{Id, RecipeDetail},
};

pub fn routes(context: Context) -> BoxedFilter<(Response,)> {
    let secret = context.secret.clone();

    let list = warp::path!("api" / "recipes")
        .and(warp::get())
        .and(with_possible_session(secret.clone()))
        .and(query_pairs())
        .and(with_context(context.clone()))
        .and_then(handle_list_recipes);

    let create = warp::path!("api" / "recipes")
        .and(warp::post())
        .and(with_session(secret.clone()))
        .and(json_body::<RecipeForm>())
        .and(with_context(context.clone()))
        .and_then(handle_create_recipe);

    let download = warp::path!("api" / "recipes" / "download_shopping_cart")
        .and(warp::get())
        .and(with_session(secret.clone()))
        .and(with_context(context.clone()))
        .and_then(handle_download_shopping_cart);

    let retrieve = warp::path!("api" / "recipes" / Id)
        .and(warp::get())
        .and(with_possible_session(secret.clone()))
        .and(with_context(context.clone()))
        .and_then(handle_get_recipe);

    let update = warp::path!("api" / "recipes" / Id)
        .and(warp::patch())
        .and(with_session(secret.clone()))
        .and(json_body::<RecipePatch>())
        .and(with_context(context.clone()))
        .and_then(handle_update_recipe);

    let delete = warp::path!("api" / "recipes" / Id)
        .and(warp::delete())
        .and(with_session(secret))
        .and(with_context(context.clone()))
        .and_then(handle_delete_recipe);

    let favorite = mark_routes(MarkKind::Favorite, "favorite", context.clone());
    let shopping_cart = mark_routes(MarkKind::ShoppingCart, "shopping_cart", context);

    list.or(create)
        .unify()
        .or(download)
        .unify()
        .or(retrieve)
        .unify()
        .or(update)
        .unify()
        .or(delete)
        .unify()
        .or(favorite)
        .unify()
        .or(shopping_cart)
        .unify()
        .boxed()
}

/// `POST` and `DELETE` on `/api/recipes/{id}/<segment>/`.
fn mark_routes(kind: MarkKind, segment: &'static str, context: Context) -> BoxedFilter<(Response,)> {
    let path = warp::path("api")
        .and(warp::path("recipes"))
        .and(warp::path::param::<Id>())
        .and(warp::path(segment))
        .and(warp::path::end());
    let kind = warp::any().map(move || kind);

    let add = path
        .clone()
        .and(warp::post())
        .and(with_session(context.secret.clone()))
        .and(kind.clone())
        .and(with_context(context.clone()))
        .and_then(handle_add_mark);

    let remove = path
        .and(warp::delete())
        .and(with_session(context.secret.clone()))
        .and(kind)
        .and(with_context(context))
        .and_then(handle_remove_mark);

    add.or(remove).unify().boxed()
}

async fn load_detail(id: Id, viewer: Option<Id>, context: &Context) -> Result<RecipeDetail, ApiError> {
    get_recipe_detail(id, viewer, &context.pool)
        .await?
        .ok_or_else(|| ApiError::not_found("No recipe exists with specified id"))
}

async fn handle_list_recipes(
    viewer: Option<SessionData>,
    query: Vec<(String, String)>,
    context: Context,
) -> Result<Response, Rejection> {
    let filter = RecipeFilter::from_query(&query)?;
    let page = Page::from_query(&query, context.page_size)?;
    let recipes = fetch_recipes(&filter, page, viewer.map(|s| s.user_id), &context.pool).await?;

    Ok(json_reply(&recipes, StatusCode::OK))
}

async fn handle_create_recipe(
    session: SessionData,
    form: RecipeForm,
    context: Context,
) -> Result<Response, Rejection> {
    session.authenticate(ActionType::CreateRecipes)?;
    form.validate()?;
    let image = decode_data_uri(&form.image)?;

    let image = context.images.save(&image).await?;
    let id = match create_recipe(session.user_id, &form, &image, &context.pool).await {
        Ok(id) => id,
        Err(e) => {
            context.images.remove(&image).await;
            return Err(e.into());
        }
    };

    info!("User {} created recipe {id}", session.user_id);
    let recipe = load_detail(id, Some(session.user_id), &context).await?;
    Ok(json_reply(&recipe, StatusCode::CREATED))
}

async fn handle_get_recipe(
    id: Id,
    viewer: Option<SessionData>,
    context: Context,
) -> Result<Response, Rejection> {
    let recipe = load_detail(id, viewer.map(|s| s.user_id), &context).await?;
    Ok(json_reply(&recipe, StatusCode::OK))
}

async fn handle_update_recipe(
    id: Id,
    session: SessionData,
    patch: RecipePatch,
    context: Context,
) -> Result<Response, Rejection> {
    let recipe = get_recipe_mut(id, &session, &context.pool).await?;
    patch.validate()?;
    let image = patch.image.as_deref().map(decode_data_uri).transpose()?;

    let image = match image {
        Some(image) => Some(context.images.save(&image).await?),
        None => None,
    };
    if let Err(e) = update_recipe(id, &patch, image.as_deref(), &context.pool).await {
        if let Some(image) = &image {
            context.images.remove(image).await;
        }
        return Err(e.into());
    }
    if image.is_some() {
        context.images.remove(&recipe.image).await;
    }

    info!("User {} updated recipe {id}", session.user_id);
    let recipe = load_detail(id, Some(session.user_id), &context).await?;
    Ok(json_reply(&recipe, StatusCode::OK))
}

async fn handle_delete_recipe(
    id: Id,
    session: SessionData,
    context: Context,
) -> Result<Response, Rejection> {
    let recipe = get_recipe_mut(id, &session, &context.pool).await?;
    delete_recipe(id, &context.pool).await?;
    context.images.remove(&recipe.image).await;

    info!("User {} deleted recipe {id}", session.user_id);
    Ok(no_content())
}

async fn handle_add_mark(
    id: Id,
    session: SessionData,
    kind: MarkKind,
    context: Context,
) -> Result<Response, Rejection> {
    session.authenticate(ActionType::ManageOwnMarks)?;
    let summary = add_mark(kind, session.user_id, id, &context.pool).await?;

    Ok(json_reply(&summary, StatusCode::CREATED))
}

async fn handle_remove_mark(
    id: Id,
    session: SessionData,
    kind: MarkKind,
    context: Context,
) -> Result<Response, Rejection> {
    session.authenticate(ActionType::ManageOwnMarks)?;
    remove_mark(kind, session.user_id, id, &context.pool).await?;

    Ok(no_content())
}

async fn handle_download_shopping_cart(
    session: SessionData,
    context: Context,
) -> Result<Response, Rejection> {
    session.authenticate(ActionType::ManageOwnMarks)?;
    let list = build_shopping_list(session.user_id, &context.pool).await?;
    let document = context.renderer.render(&list);

    let reply = with_header(document, "content-type", context.renderer.content_type());
    let reply = with_header(
        reply,
        "content-disposition",
        format!("attachment; filename=\"{}\"", context.renderer.file_name()),
    );

    info!(
        "User {} downloaded a shopping list with {} items",
        session.user_id,
        list.len()
    );
    Ok(reply.into_response())
}
