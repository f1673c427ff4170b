pub mod types;
pub mod settings;
pub mod credentials;
pub mod loader;
pub mod validator;
