pub mod schema;

pub use schema::Settings;
