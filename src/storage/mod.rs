mod local_storage;
mod schema;
mod types;
mod watch;

pub use schema::Database;
pub use types::{
    DatabaseError, Origin, StorageEvent, StoredValueError, FAVORITES_KEY, LOCATION_KEY, THEME_KEY,
};
