// Runs against a real Postgres when TEST_DATABASE_URL is set; every test
// creates its own uniquely named rows so runs do not interfere.

use std::path::Path;

use foodgram::{
    actions::{
        add_mark, build_shopping_list, create_recipe, create_tag, delete_recipe, delete_tag,
        fetch_recipes, fetch_subscriptions, follow, get_profile, get_recipe_detail, get_user_by_id,
        list_ingredients, list_recipe_ingredients, load_ingredients, register_user, remove_mark,
        unfollow, update_recipe, MarkKind,
    },
    api::{routes, Context},
    config::Config,
    error::ApiError,
    filter::RecipeFilter,
    form::{IngredientAmount, RecipeForm, RecipePatch, TagForm, UserForm},
    jwt::generate_jwt_session,
    pagination::Page,
    pool::run_migrations,
    schema::{Id, Tag, UserProfile},
    shopping::ShoppingList,
    SESSION_LIFETIME_HOURS,
};
use serde_json::{json, Value};
use sqlx::{postgres::PgPoolOptions, Pool, Postgres};
use tokio::task::JoinHandle;
use uuid::Uuid;
use warp::{http::StatusCode, test::request};

const SECRET: &str = "database-test-secret";
const PIXEL: &str = "data:image/png;base64,iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAYAAAAfFcSJAAAADUlEQVR42mP8z8BQDwAEhQGAhKmMIQAAAABJRU5ErkJggg==";

async fn setup() -> Option<Pool<Postgres>> {
    let Ok(url) = std::env::var("TEST_DATABASE_URL") else {
        eprintln!("TEST_DATABASE_URL not set, skipping");
        return None;
    };

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&url)
        .await
        .unwrap();
    run_migrations(&pool).await.unwrap();

    Some(pool)
}

fn unique(prefix: &str) -> String {
    format!("{prefix}_{}", Uuid::new_v4().simple())
}

/// Tag colors are short columns; tests bypass name normalization.
fn unique_color() -> String {
    Uuid::new_v4().simple().to_string()[..20].to_string()
}

async fn user(pool: &Pool<Postgres>) -> UserProfile {
    let username = unique("cook");
    let form = UserForm {
        email: format!("{username}@example.com"),
        username,
        first_name: String::from("Ada"),
        last_name: String::from("Cook"),
        password: String::from("s3cret-pass"),
    };
    register_user(&form, pool).await.unwrap()
}

async fn tag(pool: &Pool<Postgres>) -> Tag {
    let slug = unique("tag");
    let form = TagForm {
        name: slug.clone(),
        color: unique_color(),
        slug,
    };
    create_tag(&form, pool).await.unwrap()
}

/// Loads ingredients through the CSV importer and returns their ids.
async fn ingredients(pool: &Pool<Postgres>, rows: &[(String, &str)]) -> Vec<Id> {
    let csv = rows.iter().fold(
        String::from("name,measurement_unit\n"),
        |mut csv, (name, unit)| {
            csv.push_str(&format!("{name},{unit}\n"));
            csv
        },
    );
    load_ingredients(csv.as_bytes(), pool).await.unwrap();

    let mut ids = Vec::new();
    for (name, _) in rows {
        let found = list_ingredients(Some(name.as_str()), pool).await.unwrap();
        ids.push(found[0].id);
    }
    ids
}

fn amount(id: Id, amount: i32) -> IngredientAmount {
    IngredientAmount { id, amount }
}

async fn recipe(
    pool: &Pool<Postgres>,
    author: Id,
    tags: Vec<Id>,
    ingredients: Vec<IngredientAmount>,
) -> Id {
    let form = RecipeForm {
        ingredients,
        tags,
        image: String::new(),
        name: unique("recipe"),
        text: String::from("Mix and bake."),
        cooking_time: 30,
    };
    create_recipe(author, &form, "/media/recipes/images/test.png", pool)
        .await
        .unwrap()
}

fn total(list: &ShoppingList, name: &str, unit: &str) -> Option<i64> {
    list.items()
        .find(|item| item.name == name && item.measurement_unit == unit)
        .map(|item| item.amount)
}

/// Counts (successes, conflicts) among racing calls.
async fn outcomes<T: Send + 'static>(handles: Vec<JoinHandle<Result<T, ApiError>>>) -> (usize, usize) {
    let (mut ok, mut conflicts) = (0, 0);
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => ok += 1,
            Err(ApiError::Conflict(_)) => conflicts += 1,
            Err(e) => panic!("unexpected error: {e:?}"),
        }
    }
    (ok, conflicts)
}

fn context(pool: &Pool<Postgres>, media: &Path) -> Context {
    let media_root = media.display().to_string();
    let config = Config::from_lookup(move |key| match key {
        "DATABASE_URL" => Some(String::from("postgres://unused")),
        "JWT_SECRET" => Some(String::from(SECRET)),
        "MEDIA_ROOT" => Some(media_root.clone()),
        _ => None,
    })
    .unwrap();

    Context::new(pool.clone(), &config)
}

async fn token(pool: &Pool<Postgres>, profile: &UserProfile) -> String {
    let user = get_user_by_id(pool, profile.id).await.unwrap().unwrap();
    let token = generate_jwt_session(
        &user,
        SECRET.as_bytes(),
        chrono::Duration::hours(SESSION_LIFETIME_HOURS),
    )
    .unwrap();
    format!("Token {token}")
}

fn stored_images(media: &Path) -> Vec<String> {
    match std::fs::read_dir(media.join("recipes/images")) {
        Ok(entries) => entries
            .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
            .collect(),
        Err(_) => vec![],
    }
}

#[tokio::test]
async fn update_replaces_tags_and_ingredients() {
    let Some(pool) = setup().await else { return };
    let author = user(&pool).await;
    let (first_tag, second_tag) = (tag(&pool).await, tag(&pool).await);
    let ids = ingredients(
        &pool,
        &[
            (unique("sugar"), "g"),
            (unique("milk"), "ml"),
            (unique("yeast"), "g"),
        ],
    )
    .await;

    let id = recipe(
        &pool,
        author.id,
        vec![first_tag.id],
        vec![amount(ids[0], 100), amount(ids[1], 2)],
    )
    .await;

    let patch = RecipePatch {
        ingredients: Some(vec![amount(ids[1], 5), amount(ids[2], 1)]),
        tags: Some(vec![second_tag.id]),
        cooking_time: Some(45),
        ..Default::default()
    };
    update_recipe(id, &patch, None, &pool).await.unwrap();

    let mut lines: Vec<(Id, i32)> = list_recipe_ingredients(&[id], &pool)
        .await
        .unwrap()
        .into_iter()
        .map(|line| (line.id, line.amount))
        .collect();
    lines.sort();
    let mut expected = vec![(ids[1], 5), (ids[2], 1)];
    expected.sort();
    assert_eq!(lines, expected);

    let detail = get_recipe_detail(id, None, &pool).await.unwrap().unwrap();
    assert_eq!(detail.tags, vec![second_tag]);
    assert_eq!(detail.cooking_time, 45);
    assert_eq!(detail.image, "/media/recipes/images/test.png");
    assert_eq!(detail.author.id, author.id);
}

#[tokio::test]
async fn unknown_references_roll_back_creation() {
    let Some(pool) = setup().await else { return };
    let author = user(&pool).await;
    let tag = tag(&pool).await;

    let form = RecipeForm {
        ingredients: vec![amount(i32::MAX, 1)],
        tags: vec![tag.id],
        image: String::new(),
        name: unique("recipe"),
        text: String::from("Nothing here."),
        cooking_time: 5,
    };
    let result = create_recipe(author.id, &form, "/media/x.png", &pool).await;
    assert!(matches!(result, Err(ApiError::Validation(_))));

    let filter = RecipeFilter {
        author: Some(author.id),
        ..Default::default()
    };
    let page = fetch_recipes(&filter, Page::new(1, 6), None, &pool)
        .await
        .unwrap();
    assert_eq!(page.count, 0);
}

#[tokio::test]
async fn marks_are_unique_per_user_and_recipe() {
    let Some(pool) = setup().await else { return };
    let author = user(&pool).await;
    let reader = user(&pool).await;
    let tag = tag(&pool).await;
    let ids = ingredients(&pool, &[(unique("salt"), "g")]).await;
    let id = recipe(&pool, author.id, vec![tag.id], vec![amount(ids[0], 1)]).await;

    let summary = add_mark(MarkKind::Favorite, reader.id, id, &pool)
        .await
        .unwrap();
    assert_eq!(summary.id, id);
    assert!(matches!(
        add_mark(MarkKind::Favorite, reader.id, id, &pool).await,
        Err(ApiError::Conflict(_))
    ));

    let detail = get_recipe_detail(id, Some(reader.id), &pool)
        .await
        .unwrap()
        .unwrap();
    assert!(detail.is_favorited);
    assert!(!detail.is_in_shopping_cart);
    let anonymous = get_recipe_detail(id, None, &pool).await.unwrap().unwrap();
    assert!(!anonymous.is_favorited);

    remove_mark(MarkKind::Favorite, reader.id, id, &pool)
        .await
        .unwrap();
    assert!(matches!(
        remove_mark(MarkKind::Favorite, reader.id, id, &pool).await,
        Err(ApiError::NotFound(_))
    ));
    assert!(matches!(
        add_mark(MarkKind::ShoppingCart, reader.id, i32::MAX, &pool).await,
        Err(ApiError::NotFound(_))
    ));
}

#[tokio::test]
async fn follows_are_unique_and_never_reflexive() {
    let Some(pool) = setup().await else { return };
    let reader = user(&pool).await;
    let author = user(&pool).await;
    let tag = tag(&pool).await;
    let ids = ingredients(&pool, &[(unique("rice"), "g")]).await;
    for _ in 0..3 {
        recipe(&pool, author.id, vec![tag.id], vec![amount(ids[0], 200)]).await;
    }

    let subscription = follow(reader.id, author.id, Some(2), &pool).await.unwrap();
    assert!(subscription.profile.is_subscribed);
    let profile = get_profile(Some(reader.id), author.id, &pool)
        .await
        .unwrap()
        .unwrap();
    assert!(profile.is_subscribed);
    let own = get_profile(Some(author.id), author.id, &pool)
        .await
        .unwrap()
        .unwrap();
    assert!(!own.is_subscribed);
    assert_eq!(subscription.recipes.len(), 2);
    assert_eq!(subscription.recipes_count, 3);

    assert!(matches!(
        follow(reader.id, author.id, None, &pool).await,
        Err(ApiError::Conflict(_))
    ));
    assert!(matches!(
        follow(reader.id, reader.id, None, &pool).await,
        Err(ApiError::Validation(_))
    ));

    let page = fetch_subscriptions(reader.id, Page::new(1, 6), None, &pool)
        .await
        .unwrap();
    assert_eq!(page.count, 1);
    assert_eq!(page.results[0].profile.id, author.id);
    assert_eq!(page.results[0].recipes.len(), 3);

    unfollow(reader.id, author.id, &pool).await.unwrap();
    assert!(matches!(
        unfollow(reader.id, author.id, &pool).await,
        Err(ApiError::Validation(_))
    ));
}

#[tokio::test]
async fn shopping_list_sums_amounts_across_cart() {
    let Some(pool) = setup().await else { return };
    let author = user(&pool).await;
    let shopper = user(&pool).await;
    let tag = tag(&pool).await;
    let flour = unique("flour");
    let egg = unique("egg");
    let ids = ingredients(&pool, &[(flour.clone(), "g"), (egg.clone(), "pcs")]).await;

    let first = recipe(&pool, author.id, vec![tag.id], vec![amount(ids[0], 100)]).await;
    let second = recipe(
        &pool,
        author.id,
        vec![tag.id],
        vec![amount(ids[0], 50), amount(ids[1], 2)],
    )
    .await;

    for id in [first, second] {
        add_mark(MarkKind::ShoppingCart, shopper.id, id, &pool)
            .await
            .unwrap();
    }

    let list = build_shopping_list(shopper.id, &pool).await.unwrap();
    assert_eq!(list.len(), 2);
    assert_eq!(total(&list, &flour, "g"), Some(150));
    assert_eq!(total(&list, &egg, "pcs"), Some(2));

    delete_recipe(second, &pool).await.unwrap();
    let list = build_shopping_list(shopper.id, &pool).await.unwrap();
    assert_eq!(total(&list, &flour, "g"), Some(100));
    assert_eq!(total(&list, &egg, "pcs"), None);
}

#[tokio::test]
async fn filters_combine_with_and() {
    let Some(pool) = setup().await else { return };
    let author = user(&pool).await;
    let other = user(&pool).await;
    let (breakfast, dinner) = (tag(&pool).await, tag(&pool).await);
    let ids = ingredients(&pool, &[(unique("oats"), "g")]).await;
    let line = || vec![amount(ids[0], 10)];

    let porridge = recipe(&pool, author.id, vec![breakfast.id], line()).await;
    let stew = recipe(&pool, author.id, vec![dinner.id], line()).await;
    let both = recipe(&pool, author.id, vec![breakfast.id, dinner.id], line()).await;
    let foreign = recipe(&pool, other.id, vec![breakfast.id], line()).await;

    let found = |filter: RecipeFilter, viewer: Option<Id>| {
        let pool = pool.clone();
        async move {
            let mut ids: Vec<Id> = fetch_recipes(&filter, Page::new(1, 100), viewer, &pool)
                .await
                .unwrap()
                .results
                .into_iter()
                .map(|r| r.id)
                .collect();
            ids.sort();
            ids
        }
    };

    let by_tag = RecipeFilter {
        tags: vec![breakfast.slug.clone()],
        ..Default::default()
    };
    let mut expected = vec![porridge, both, foreign];
    expected.sort();
    assert_eq!(found(by_tag, None).await, expected);

    let by_tag_and_author = RecipeFilter {
        tags: vec![breakfast.slug.clone()],
        author: Some(author.id),
        ..Default::default()
    };
    let mut expected = vec![porridge, both];
    expected.sort();
    assert_eq!(found(by_tag_and_author, None).await, expected);

    let either_tag = RecipeFilter {
        tags: vec![breakfast.slug.clone(), dinner.slug.clone()],
        author: Some(author.id),
        ..Default::default()
    };
    let mut expected = vec![porridge, stew, both];
    expected.sort();
    assert_eq!(found(either_tag, None).await, expected);

    add_mark(MarkKind::Favorite, other.id, stew, &pool)
        .await
        .unwrap();
    let favorites = RecipeFilter {
        author: Some(author.id),
        is_favorited: true,
        ..Default::default()
    };
    assert_eq!(found(favorites.clone(), Some(other.id)).await, vec![stew]);
    assert!(found(favorites, None).await.is_empty());

    let detail = get_recipe_detail(stew, Some(other.id), &pool)
        .await
        .unwrap()
        .unwrap();
    assert!(detail.is_favorited);
    assert!(!detail.is_in_shopping_cart);
}

#[tokio::test]
async fn duplicates_surface_as_conflicts() {
    let Some(pool) = setup().await else { return };
    let tag = tag(&pool).await;

    let same_slug = TagForm {
        name: unique("other"),
        color: unique_color(),
        slug: tag.slug.clone(),
    };
    assert!(matches!(
        create_tag(&same_slug, &pool).await,
        Err(ApiError::Conflict(_))
    ));

    let author = user(&pool).await;
    let form = UserForm {
        email: author.email.clone(),
        username: unique("cook"),
        first_name: String::from("Ada"),
        last_name: String::from("Cook"),
        password: String::from("s3cret-pass"),
    };
    assert!(matches!(
        register_user(&form, &pool).await,
        Err(ApiError::Conflict(_))
    ));

    let ids = ingredients(&pool, &[(unique("basil"), "g")]).await;
    recipe(&pool, author.id, vec![tag.id], vec![amount(ids[0], 1)]).await;
    assert!(matches!(
        delete_tag(tag.id, &pool).await,
        Err(ApiError::Conflict(_))
    ));
}

#[tokio::test]
async fn concurrent_duplicates_become_conflicts() {
    let Some(pool) = setup().await else { return };
    let author = user(&pool).await;
    let reader = user(&pool).await;
    let tag = tag(&pool).await;
    let ids = ingredients(&pool, &[(unique("pepper"), "g")]).await;
    let id = recipe(&pool, author.id, vec![tag.id], vec![amount(ids[0], 3)]).await;

    for kind in [MarkKind::Favorite, MarkKind::ShoppingCart] {
        let handles = (0..8)
            .map(|_| {
                let pool = pool.clone();
                let reader = reader.id;
                tokio::spawn(async move { add_mark(kind, reader, id, &pool).await })
            })
            .collect();
        assert_eq!(outcomes(handles).await, (1, 7));
    }

    let handles = (0..6)
        .map(|_| {
            let pool = pool.clone();
            let (reader, author) = (reader.id, author.id);
            tokio::spawn(async move { follow(reader, author, None, &pool).await })
        })
        .collect();
    assert_eq!(outcomes(handles).await, (1, 5));
}

#[tokio::test]
async fn recipe_images_follow_the_recipe() {
    let Some(pool) = setup().await else { return };
    let media = tempfile::tempdir().unwrap();
    let routes = routes(context(&pool, media.path()));
    let author = user(&pool).await;
    let stranger = user(&pool).await;
    let tag = tag(&pool).await;
    let ids = ingredients(&pool, &[(unique("butter"), "g")]).await;

    let created = request()
        .method("POST")
        .path("/api/recipes/")
        .header("authorization", token(&pool, &author).await)
        .json(&json!({
            "ingredients": [{"id": ids[0], "amount": 25}],
            "tags": [tag.id],
            "image": PIXEL,
            "name": unique("toast"),
            "text": "Butter the toast.",
            "cooking_time": 3
        }))
        .reply(&routes)
        .await;
    assert_eq!(created.status(), StatusCode::CREATED);
    let body: Value = serde_json::from_slice(created.body()).unwrap();
    let id = body["id"].as_i64().unwrap();
    let first = stored_images(media.path());
    assert_eq!(first.len(), 1);

    // Permission is checked before the patch is validated.
    let forbidden = request()
        .method("PATCH")
        .path(&format!("/api/recipes/{id}/"))
        .header("authorization", token(&pool, &stranger).await)
        .json(&json!({"cooking_time": 0}))
        .reply(&routes)
        .await;
    assert_eq!(forbidden.status(), StatusCode::FORBIDDEN);

    let invalid = request()
        .method("PATCH")
        .path(&format!("/api/recipes/{id}/"))
        .header("authorization", token(&pool, &author).await)
        .json(&json!({"cooking_time": 0}))
        .reply(&routes)
        .await;
    assert_eq!(invalid.status(), StatusCode::BAD_REQUEST);

    let replaced = request()
        .method("PATCH")
        .path(&format!("/api/recipes/{id}/"))
        .header("authorization", token(&pool, &author).await)
        .json(&json!({"image": PIXEL}))
        .reply(&routes)
        .await;
    assert_eq!(replaced.status(), StatusCode::OK);
    let second = stored_images(media.path());
    assert_eq!(second.len(), 1);
    assert_ne!(second, first);

    let deleted = request()
        .method("DELETE")
        .path(&format!("/api/recipes/{id}/"))
        .header("authorization", token(&pool, &author).await)
        .reply(&routes)
        .await;
    assert_eq!(deleted.status(), StatusCode::NO_CONTENT);
    assert!(stored_images(media.path()).is_empty());
}
