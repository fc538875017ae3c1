pub mod connection;
pub mod endpoints;
pub mod text_generator;

pub use connection::ApiConnectionError;
pub use endpoints::Provider;
pub use text_generator::{OpenRouterTextGenerator, TextGenerator};
