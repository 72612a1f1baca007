//! The RequestWave check families, registered in the order a full run
//! executes them. Later suites reuse songs and requests created by earlier
//! ones through the shared [`Session`](crate::session::Session).

pub mod analytics;
pub mod auth;
pub mod genres;
pub mod playlists;
pub mod polling;
pub mod public;
pub mod requests;
pub mod songs;
pub mod subscription;

pub use analytics::AnalyticsSuite;
pub use auth::AuthSuite;
pub use genres::GenresSuite;
pub use playlists::PlaylistsSuite;
pub use polling::PollingSuite;
pub use public::PublicSuite;
pub use requests::RequestsSuite;
pub use songs::SongsSuite;
pub use subscription::SubscriptionSuite;

use crate::scenario::SuiteRegistry;

pub fn standard_registry() -> SuiteRegistry {
    let mut registry = SuiteRegistry::new();
    registry.register(Box::new(AuthSuite::new()));
    registry.register(Box::new(SongsSuite::new()));
    registry.register(Box::new(GenresSuite::new()));
    registry.register(Box::new(PublicSuite::new()));
    registry.register(Box::new(RequestsSuite::new()));
    registry.register(Box::new(AnalyticsSuite::new()));
    registry.register(Box::new(PollingSuite::new()));
    registry.register(Box::new(PlaylistsSuite::new()));
    registry.register(Box::new(SubscriptionSuite::new()));
    registry
}
