use crate::error::{HarnessError, HarnessResult};
use crate::scenario::{describe, ids_of, item_id, unknown_check, CheckOutcome, Suite};
use crate::session::{short_id, Session};
use api::{ApiRequest, Endpoint, NewSong, Song};
use async_trait::async_trait;
use serde_json::{json, Value};

const CHECKS: &[&str] = &[
    "list_songs",
    "create_song",
    "update_song",
    "created_song_listed",
    "song_metadata_persisted",
    "batch_delete_songs",
    "delete_song",
];

const UPDATED_GENRES: &[&str] = &["Rock", "Pop"];
const UPDATED_MOODS: &[&str] = &["Upbeat", "Romantic"];

#[derive(Default)]
pub struct SongsSuite {
    song_id: Option<String>,
    updated_title: Option<String>,
}

impl SongsSuite {
    pub fn new() -> Self {
        Self::default()
    }

    fn song_id(&self) -> HarnessResult<&str> {
        self.song_id
            .as_deref()
            .ok_or_else(|| HarnessError::precondition("create_song did not produce a song"))
    }

    async fn fetch_songs(session: &Session) -> HarnessResult<Vec<Value>> {
        let response = session.send_authed(ApiRequest::get(Endpoint::Songs)).await?;
        response.expect_success()?;
        Ok(response.list(&["songs"]).cloned().unwrap_or_default())
    }

    async fn list_songs(&self, session: &Session) -> HarnessResult<CheckOutcome> {
        let response = session.send_authed(ApiRequest::get(Endpoint::Songs)).await?;
        if response.status != 200 {
            return Ok(CheckOutcome::fail(format!(
                "listing songs failed: {}",
                describe(&response)
            )));
        }
        Ok(match response.list(&["songs"]) {
            Some(songs) => CheckOutcome::pass(format!("{} songs listed", songs.len())),
            None => CheckOutcome::fail("songs response is not a list"),
        })
    }

    async fn create_song(&mut self, session: &mut Session) -> HarnessResult<CheckOutcome> {
        let song = NewSong::new(format!("Smoke Test Song {}", short_id()), "Smoke Tester")
            .with_genres(&["Rock"])
            .with_moods(&["Upbeat"])
            .with_year(1999);

        let id = session.create_song(&song).await?;
        self.song_id = Some(id.clone());
        Ok(CheckOutcome::pass(format!("created song {}", id)))
    }

    async fn update_song(&mut self, session: &Session) -> HarnessResult<CheckOutcome> {
        let id = self.song_id()?.to_string();
        let title = format!("Smoke Test Song {} (edited)", short_id());

        let request = ApiRequest::put(Endpoint::Song(id)).with_json(json!({
            "title": title,
            "artist": "Smoke Tester",
            "genres": UPDATED_GENRES,
            "moods": UPDATED_MOODS,
            "year": 2001,
        }));
        let response = session.send_authed(request).await?;
        if response.status != 200 {
            return Ok(CheckOutcome::fail(format!(
                "update failed: {}",
                describe(&response)
            )));
        }

        let returned = response.str_field("title").map(str::to_string);
        self.updated_title = Some(title.clone());
        Ok(CheckOutcome::check(
            returned.as_deref().map_or(true, |t| t == title),
            "song updated",
            format!("update returned title {:?}, expected {:?}", returned, title),
        ))
    }

    async fn created_song_listed(&self, session: &Session) -> HarnessResult<CheckOutcome> {
        let id = self.song_id()?;
        let songs = Self::fetch_songs(session).await?;
        Ok(CheckOutcome::check(
            ids_of(&songs).iter().any(|s| s == id),
            format!("song {} present among {} songs", id, songs.len()),
            format!("song {} missing from listing", id),
        ))
    }

    async fn song_metadata_persisted(&self, session: &Session) -> HarnessResult<CheckOutcome> {
        let id = self.song_id()?;
        let songs = Self::fetch_songs(session).await?;

        let Some(raw) = songs
            .iter()
            .find(|s| item_id(s).as_deref() == Some(id))
        else {
            return Ok(CheckOutcome::fail(format!("song {} missing from listing", id)));
        };
        let song: Song = serde_json::from_value(raw.clone())?;

        let mut problems = Vec::new();
        for genre in UPDATED_GENRES {
            if !song.genres.iter().any(|g| g == genre) {
                problems.push(format!("genre {} missing", genre));
            }
        }
        for mood in UPDATED_MOODS {
            if !song.moods.iter().any(|m| m == mood) {
                problems.push(format!("mood {} missing", mood));
            }
        }
        if let Some(expected) = &self.updated_title {
            if &song.title != expected {
                problems.push(format!("title is {:?}", song.title));
            }
        }

        Ok(CheckOutcome::check(
            problems.is_empty(),
            format!("genres {:?}, moods {:?}", song.genres, song.moods),
            problems.join("; "),
        ))
    }

    async fn batch_delete_songs(&self, session: &mut Session) -> HarnessResult<CheckOutcome> {
        let mut ids = Vec::new();
        for n in 1..=2 {
            let title = format!("Smoke Batch Song {} {}", n, short_id());
            let song = NewSong::new(title, "Smoke Tester");
            ids.push(session.create_song(&song).await?);
        }

        let request =
            ApiRequest::post(Endpoint::SongsBatchDelete).with_json(json!({ "song_ids": ids }));
        let response = session.send_authed(request).await?;
        if !response.is_success() {
            return Ok(CheckOutcome::fail(format!(
                "batch delete failed: {}",
                describe(&response)
            )));
        }

        let remaining = ids_of(&Self::fetch_songs(session).await?);
        let survivors: Vec<&String> = ids.iter().filter(|id| remaining.contains(id)).collect();
        if survivors.is_empty() {
            for id in &ids {
                session.forget_song(id);
            }
        }

        Ok(CheckOutcome::check(
            survivors.is_empty(),
            format!("batch deleted {} songs", ids.len()),
            format!("songs still listed after batch delete: {:?}", survivors),
        ))
    }

    async fn delete_song(&mut self, session: &mut Session) -> HarnessResult<CheckOutcome> {
        let id = self.song_id()?.to_string();
        let response = session
            .send_authed(ApiRequest::delete(Endpoint::Song(id.clone())))
            .await?;
        if !matches!(response.status, 200 | 204) {
            return Ok(CheckOutcome::fail(format!(
                "delete failed: {}",
                describe(&response)
            )));
        }
        session.forget_song(&id);
        self.song_id = None;

        let songs = Self::fetch_songs(session).await?;
        Ok(CheckOutcome::check(
            !ids_of(&songs).contains(&id),
            format!("song {} deleted", id),
            format!("song {} still listed after delete", id),
        ))
    }
}

#[async_trait]
impl Suite for SongsSuite {
    fn name(&self) -> &'static str {
        "songs"
    }

    fn description(&self) -> &'static str {
        "song library create, update and delete"
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
            "list_songs" => self.list_songs(session).await,
            "create_song" => self.create_song(session).await,
            "update_song" => self.update_song(session).await,
            "created_song_listed" => self.created_song_listed(session).await,
            "song_metadata_persisted" => self.song_metadata_persisted(session).await,
            "batch_delete_songs" => self.batch_delete_songs(session).await,
            "delete_song" => self.delete_song(session).await,
            _ => Err(unknown_check(self.name(), check)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::suites::test_support::authed_session;

    #[tokio::test]
    async fn test_checks_need_a_created_song() {
        let mut server = mockito::Server::new_async().await;
        let mut session = authed_session(&mut server).await;
        let mut suite = SongsSuite::new();

        let result = suite.run_check("update_song", &mut session).await;
        assert!(matches!(result, Err(HarnessError::Precondition { .. })));
    }

    #[tokio::test]
    async fn test_create_list_and_metadata() {
        let mut server = mockito::Server::new_async().await;
        let mut session = authed_session(&mut server).await;
        let _create = server
            .mock("POST", "/api/songs")
            .match_header("authorization", "Bearer t1")
            .with_status(201)
            .with_body(r#"{"id":"s1","title":"Smoke Test Song","artist":"Smoke Tester"}"#)
            .create_async()
            .await;
        let _list = server
            .mock("GET", "/api/songs")
            .with_status(200)
            .with_body(
                json!([{
                    "id": "s1",
                    "title": "Smoke Test Song",
                    "artist": "Smoke Tester",
                    "genres": ["Rock", "Pop"],
                    "moods": ["Upbeat"]
                }])
                .to_string(),
            )
            .create_async()
            .await;

        let mut suite = SongsSuite::new();
        for check in ["list_songs", "create_song", "created_song_listed"] {
            let outcome = suite.run_check(check, &mut session).await.unwrap();
            assert!(outcome.success, "{}: {}", check, outcome.message);
        }
        assert_eq!(session.created_songs(), ["s1".to_string()]);

        let metadata = suite
            .run_check("song_metadata_persisted", &mut session)
            .await
            .unwrap();
        assert!(!metadata.success);
        assert_eq!(metadata.message, "mood Romantic missing");
    }

    #[tokio::test]
    async fn test_delete_song_forgets_tracked_id() {
        let mut server = mockito::Server::new_async().await;
        let mut session = authed_session(&mut server).await;
        let _delete = server
            .mock("DELETE", "/api/songs/s9")
            .with_status(204)
            .create_async()
            .await;
        let _list = server
            .mock("GET", "/api/songs")
            .with_status(200)
            .with_body(r#"{"songs":[{"id":"s1","title":"a","artist":"b"}]}"#)
            .create_async()
            .await;

        session.track_song("s9");
        let mut suite = SongsSuite {
            song_id: Some("s9".to_string()),
            updated_title: None,
        };

        let outcome = suite.run_check("delete_song", &mut session).await.unwrap();
        assert!(outcome.success, "{}", outcome.message);
        assert!(session.created_songs().is_empty());
    }

    #[tokio::test]
    async fn test_batch_delete_reports_survivors() {
        let mut server = mockito::Server::new_async().await;
        let mut session = authed_session(&mut server).await;
        let _create = server
            .mock("POST", "/api/songs")
            .with_status(201)
            .with_body(r#"{"id":"b1"}"#)
            .create_async()
            .await;
        let _batch = server
            .mock("POST", "/api/songs/batch-delete")
            .with_status(200)
            .with_body(r#"{"deleted":2}"#)
            .create_async()
            .await;
        let _list = server
            .mock("GET", "/api/songs")
            .with_status(200)
            .with_body(r#"[{"id":"b1","title":"a","artist":"b"}]"#)
            .create_async()
            .await;

        let mut suite = SongsSuite::new();
        let outcome = suite
            .run_check("batch_delete_songs", &mut session)
            .await
            .unwrap();
        assert!(!outcome.success);
        assert!(outcome.message.contains("b1"));
        assert_eq!(session.created_songs().len(), 2);
    }
}
