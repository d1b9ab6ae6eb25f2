use std::{convert::Infallible, sync::Arc};

use serde::{de::DeserializeOwned, Serialize};
use sqlx::{Pool, Postgres};
use warp::{
    http::StatusCode,
    reply::{self, Response},
    Filter, Rejection, Reply,
};

use crate::{
    config::Config,
    constants::MAX_BODY_SIZE,
    media::ImageStore,
    shopping::{DocumentRenderer, PlainTextRenderer},
};

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct Context {
    pub pool: Pool<Postgres>,
    pub secret: Arc<[u8]>,
    pub images: Arc<ImageStore>,
    pub renderer: Arc<dyn DocumentRenderer>,
    pub page_size: i64,
}

impl Context {
    pub fn new(pool: Pool<Postgres>, config: &Config) -> Self {
        Self {
            pool,
            secret: Arc::from(config.jwt_secret.as_bytes()),
            images: Arc::new(ImageStore::new(config.media_root.clone())),
            renderer: Arc::new(PlainTextRenderer),
            page_size: config.page_size,
        }
    }
}

pub fn with_context(
    context: Context,
) -> impl Filter<Extract = (Context,), Error = Infallible> + Clone {
    warp::any().map(move || context.clone())
}

pub fn json_body<T>() -> impl Filter<Extract = (T,), Error = Rejection> + Clone
where
    T: DeserializeOwned + Send,
{
    warp::body::content_length_limit(MAX_BODY_SIZE).and(warp::body::json())
}

/// Raw query pairs; repeated keys are kept.
pub fn query_pairs() -> impl Filter<Extract = (Vec<(String, String)>,), Error = Rejection> + Clone
{
    warp::query::<Vec<(String, String)>>()
}

pub fn json_reply<T: Serialize>(value: &T, status: StatusCode) -> Response {
    reply::with_status(reply::json(value), status).into_response()
}

pub fn no_content() -> Response {
    StatusCode::NO_CONTENT.into_response()
}
