use crate::error::{HarnessError, HarnessResult};
use crate::scenario::{describe, ids_of, item_id, unknown_check, CheckOutcome, Suite};
use crate::session::{short_id, Session};
use api::{ApiRequest, ApiResponse, Endpoint, NewPlaylist};
use async_trait::async_trait;

const CHECKS: &[&str] = &[
    "list_playlists",
    "create_playlist",
    "activate_playlist",
    "public_songs_follow_playlist",
    "delete_playlist",
];

/// Playlists are a Pro feature; a 403 on a trial account is the expected gate.
const GATED: u16 = 403;

#[derive(Default)]
pub struct PlaylistsSuite {
    gated: bool,
    playlist_id: Option<String>,
    song_ids: Vec<String>,
}

impl PlaylistsSuite {
    pub fn new() -> Self {
        Self::default()
    }

    fn playlist_id(&self) -> HarnessResult<&str> {
        self.playlist_id
            .as_deref()
            .ok_or_else(|| HarnessError::precondition("create_playlist did not produce a playlist"))
    }

    fn gated_outcome(&mut self, response: &ApiResponse) -> Option<CheckOutcome> {
        if response.status == GATED {
            self.gated = true;
            return Some(CheckOutcome::pass(format!(
                "playlists gated by plan: {}",
                response.error_message()
            )));
        }
        None
    }

    fn skipped_when_gated(&self) -> Option<CheckOutcome> {
        self.gated
            .then(|| CheckOutcome::pass("skipped: playlists gated by plan"))
    }

    async fn list_playlists(&mut self, session: &Session) -> HarnessResult<CheckOutcome> {
        let response = session
            .send_authed(ApiRequest::get(Endpoint::Playlists))
            .await?;
        if let Some(outcome) = self.gated_outcome(&response) {
            return Ok(outcome);
        }
        if response.status != 200 {
            return Ok(CheckOutcome::fail(describe(&response)));
        }
        Ok(match response.list(&["playlists"]) {
            Some(items) => CheckOutcome::pass(format!("{} playlists", items.len())),
            None => CheckOutcome::fail("playlists response is not a list"),
        })
    }

    async fn create_playlist(&mut self, session: &mut Session) -> HarnessResult<CheckOutcome> {
        if let Some(skipped) = self.skipped_when_gated() {
            return Ok(skipped);
        }

        let song_id = session.ensure_song().await?;
        let payload = NewPlaylist {
            name: format!("Smoke Playlist {}", short_id()),
            song_ids: vec![song_id],
        };
        let response = session
            .send_authed(ApiRequest::post(Endpoint::Playlists).with_body(&payload)?)
            .await?;
        if let Some(outcome) = self.gated_outcome(&response) {
            return Ok(outcome);
        }
        if !matches!(response.status, 200 | 201) {
            return Ok(CheckOutcome::fail(describe(&response)));
        }

        let Some(id) = item_id(&response.body) else {
            return Ok(CheckOutcome::fail("playlist created but no id returned"));
        };
        session.track_playlist(id.clone());
        self.playlist_id = Some(id.clone());
        self.song_ids = payload.song_ids;
        Ok(CheckOutcome::pass(format!("created playlist {}", id)))
    }

    async fn activate_playlist(&self, session: &Session) -> HarnessResult<CheckOutcome> {
        if let Some(skipped) = self.skipped_when_gated() {
            return Ok(skipped);
        }
        let id = self.playlist_id()?.to_string();
        let response = session
            .send_authed(ApiRequest::put(Endpoint::PlaylistActivate(id.clone())))
            .await?;
        Ok(CheckOutcome::check(
            response.status == 200,
            format!("playlist {} activated", id),
            format!("activating playlist {} failed: {}", id, describe(&response)),
        ))
    }

    async fn public_songs_follow_playlist(&self, session: &Session) -> HarnessResult<CheckOutcome> {
        if let Some(skipped) = self.skipped_when_gated() {
            return Ok(skipped);
        }
        self.playlist_id()?;

        let slug = session.slug()?.to_string();
        let response = session
            .send(ApiRequest::get(Endpoint::MusicianSongs(slug)))
            .await?;
        if response.status != 200 {
            return Ok(CheckOutcome::fail(describe(&response)));
        }
        let Some(items) = response.list(&["songs"]) else {
            return Ok(CheckOutcome::fail("public songs response is not a list"));
        };

        let shown = ids_of(items);
        let outside: Vec<&String> = shown
            .iter()
            .filter(|id| !self.song_ids.contains(id))
            .collect();
        if !outside.is_empty() {
            return Ok(CheckOutcome::fail(format!(
                "public page shows songs outside the playlist: {:?}",
                outside
            )));
        }

        let hidden: Vec<&String> = self
            .song_ids
            .iter()
            .filter(|id| !shown.contains(id))
            .collect();
        Ok(CheckOutcome::check(
            hidden.is_empty(),
            format!("public page shows {} playlist songs", shown.len()),
            format!("public page hides playlist songs: {:?}", hidden),
        ))
    }

    async fn delete_playlist(&mut self, session: &mut Session) -> HarnessResult<CheckOutcome> {
        if let Some(skipped) = self.skipped_when_gated() {
            return Ok(skipped);
        }
        let id = self.playlist_id()?.to_string();
        let response = session
            .send_authed(ApiRequest::delete(Endpoint::Playlist(id.clone())))
            .await?;
        if !matches!(response.status, 200 | 204) {
            return Ok(CheckOutcome::fail(describe(&response)));
        }
        session.forget_playlist(&id);
        self.playlist_id = None;
        Ok(CheckOutcome::pass(format!("playlist {} deleted", id)))
    }
}

#[async_trait]
impl Suite for PlaylistsSuite {
    fn name(&self) -> &'static str {
        "playlists"
    }

    fn description(&self) -> &'static str {
        "playlists and the public song list they filter"
    }

    fn checks(&self) -> &'static [&'static str] {
        CHECKS
    }

    async fn run_check(
        &mut self,
        check: &str,
        session: &mut Session,
    ) -> HarnessResult<CheckOutcome> {
        match check {
            "list_playlists" => self.list_playlists(session).await,
            "create_playlist" => self.create_playlist(session).await,
            "activate_playlist" => self.activate_playlist(session).await,
            "public_songs_follow_playlist" => self.public_songs_follow_playlist(session).await,
            "delete_playlist" => self.delete_playlist(session).await,
            _ => Err(unknown_check(self.name(), check)),
        }
    }
}
