pub mod auth;

pub use auth::{
    create_token, generate_password, hash_password, verify_password, verify_token, Claims,
    GENERATED_PASSWORD_LEN,
};
