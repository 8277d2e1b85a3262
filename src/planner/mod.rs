pub mod prompt;
pub mod types;
pub mod validator;
