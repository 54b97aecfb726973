pub mod auth;

pub use auth::{
    HealthResponse, LoginRequest, LoginResponse, LogoutResponse, OAuthCallbackQuery,
    TokenRefreshResponse,
};
