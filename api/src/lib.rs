pub mod client;
pub mod config;
pub mod error;
pub mod types;

pub use client::{ApiRequest, ApiResponse, Endpoint, RequestWaveClient};
pub use config::ClientConfig;
pub use error::{ApiError, ApiResult};
pub use types::{
    AuthResponse, CheckoutRequest, CheckoutSession, Credentials, DailyAnalytics,
    ForgotPasswordRequest, Musician, NewPlaylist, NewSong, NewSongRequest, Playlist,
    RegisterRequest, RequestStatus, RequestUpdates, RequesterStat, ResetPasswordRequest, Song,
    SongRequest, StatusUpdate, SubscriptionStatus,
};

pub mod prelude {
    pub use crate::client::*;
    pub use crate::config::*;
    pub use crate::error::*;
    pub use crate::types::*;
}
