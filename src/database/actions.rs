mod cart;
mod follows;
mod ingredients;
mod marks;
mod recipes;
mod tags;
mod users;

pub use cart::*;
pub use follows::*;
pub use ingredients::*;
pub use marks::*;
pub use recipes::*;
pub use tags::*;
pub use users::*;
