use crate::error::HarnessResult;
use crate::scenario::{describe, string_list, unknown_check, CheckOutcome, Suite};
use crate::session::Session;
use api::{ApiRequest, Endpoint, Song};
use async_trait::async_trait;

const CHECKS: &[&str] = &["genres_listed", "moods_listed", "filter_songs_by_genre"];

const FILTER_GENRE: &str = "Rock";

#[derive(Default)]
pub struct GenresSuite;

impl GenresSuite {
    pub fn new() -> Self {
        Self
    }

    async fn vocabulary(
        &self,
        session: &Session,
        endpoint: Endpoint,
        key: &str,
    ) -> HarnessResult<CheckOutcome> {
        let response = session.send_authed(ApiRequest::get(endpoint)).await?;
        if response.status != 200 {
            return Ok(CheckOutcome::fail(describe(&response)));
        }
        let Some(items) = response.list(&[key]) else {
            return Ok(CheckOutcome::fail(format!("{} response is not a list", key)));
        };

        let names = string_list(items);
        Ok(CheckOutcome::check(
            !names.is_empty(),
            format!("{} {}: {}", names.len(), key, names.join(", ")),
            format!("no {} returned", key),
        ))
    }

    /// The session's own song is tagged Rock, so the filtered list must
    /// contain it and nothing untagged.
    async fn filter_songs_by_genre(&self, session: &mut Session) -> HarnessResult<CheckOutcome> {
        let own_song = session.ensure_song().await?;
        let request = ApiRequest::get(Endpoint::Songs).with_query("genre", FILTER_GENRE);
        let response = session.send_authed(request).await?;
        if response.status != 200 {
            return Ok(CheckOutcome::fail(describe(&response)));
        }
        let Some(items) = response.list(&["songs"]) else {
            return Ok(CheckOutcome::fail("filtered songs response is not a list"));
        };

        let songs: Vec<Song> = items
            .iter()
            .map(|item| serde_json::from_value(item.clone()))
            .collect::<Result<_, _>>()?;
        let strays: Vec<&str> = songs
            .iter()
            .filter(|song| {
                !song
                    .genres
                    .iter()
                    .any(|g| g.eq_ignore_ascii_case(FILTER_GENRE))
            })
            .map(|song| song.title.as_str())
            .collect();

        if !songs.iter().any(|song| song.id == own_song) {
            return Ok(CheckOutcome::fail(format!(
                "filter by {} left out song {} tagged {}",
                FILTER_GENRE, own_song, FILTER_GENRE
            )));
        }
        Ok(CheckOutcome::check(
            strays.is_empty(),
            format!("{} songs tagged {}", songs.len(), FILTER_GENRE),
            format!("filter by {} returned untagged songs: {:?}", FILTER_GENRE, strays),
        ))
    }
}

#[async_trait]
impl Suite for GenresSuite {
    fn name(&self) -> &'static str {
        "genres"
    }

    fn description(&self) -> &'static str {
        "genre and mood vocabularies"
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
            "genres_listed" => self.vocabulary(session, Endpoint::Genres, "genres").await,
            "moods_listed" => self.vocabulary(session, Endpoint::Moods, "moods").await,
            "filter_songs_by_genre" => self.filter_songs_by_genre(session).await,
            _ => Err(unknown_check(self.name(), check)),
        }
    }
}
