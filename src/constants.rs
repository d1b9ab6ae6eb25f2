pub const RECIPE_COUNT_PER_PAGE: i64 = 6;
pub const MAX_PAGE_SIZE: i64 = 100;

pub const MAX_BODY_SIZE: u64 = 10 * 1024 * 1024;

pub const EMAIL_MAX_LENGTH: usize = 254;
pub const USER_FIELD_MAX_LENGTH: usize = 150;
pub const NAME_MAX_LENGTH: usize = 200;

pub const SESSION_LIFETIME_HOURS: i64 = 24;

pub const MEDIA_URL: &str = "/media/";
pub const RECIPE_IMAGE_DIR: &str = "recipes/images";
pub const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "webp"];

pub const INGREDIENT_INSERT_CHUNK: usize = 1000;

pub const SHOPPING_LIST_TITLE: &str = "Shopping list";
pub const SHOPPING_LIST_FILE_NAME: &str = "shopping_list.txt";
