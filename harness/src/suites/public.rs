use crate::error::HarnessResult;
use crate::scenario::{describe, unknown_check, CheckOutcome, Suite};
use crate::session::{short_id, Session};
use api::{ApiRequest, ApiResponse, Endpoint};
use async_trait::async_trait;
use serde_json::Value;

const CHECKS: &[&str] = &[
    "public_profile",
    "public_profile_hides_private_fields",
    "public_song_list",
    "unknown_musician_404",
];

const PRIVATE_FIELDS: &[&str] = &[
    "email",
    "password",
    "password_hash",
    "hashed_password",
    "stripe_customer_id",
];

/// Checks run without a bearer token, as an audience member would browse.
#[derive(Default)]
pub struct PublicSuite;

impl PublicSuite {
    pub fn new() -> Self {
        Self
    }

    async fn profile(session: &Session) -> HarnessResult<ApiResponse> {
        let slug = session.slug()?.to_string();
        Ok(session
            .send(ApiRequest::get(Endpoint::MusicianProfile(slug)))
            .await?)
    }

    async fn public_profile(&self, session: &Session) -> HarnessResult<CheckOutcome> {
        let response = Self::profile(session).await?;
        if response.status != 200 {
            return Ok(CheckOutcome::fail(describe(&response)));
        }
        let profile = profile_object(&response.body);
        let slug = session.slug()?;
        let reported = profile.get("slug").and_then(Value::as_str);
        Ok(CheckOutcome::check(
            reported.map_or(true, |s| s == slug),
            format!("profile for {} is public", slug),
            format!("profile for {} reports slug {:?}", slug, reported),
        ))
    }

    async fn hides_private_fields(&self, session: &Session) -> HarnessResult<CheckOutcome> {
        let response = Self::profile(session).await?;
        if response.status != 200 {
            return Ok(CheckOutcome::fail(describe(&response)));
        }
        let leaked = leaked_fields(profile_object(&response.body));
        Ok(CheckOutcome::check(
            leaked.is_empty(),
            "no private fields exposed",
            format!("public profile exposes {:?}", leaked),
        ))
    }

    async fn public_song_list(&self, session: &Session) -> HarnessResult<CheckOutcome> {
        let slug = session.slug()?.to_string();
        let response = session
            .send(ApiRequest::get(Endpoint::MusicianSongs(slug)))
            .await?;
        if response.status != 200 {
            return Ok(CheckOutcome::fail(describe(&response)));
        }
        Ok(match response.list(&["songs"]) {
            Some(songs) => CheckOutcome::pass(format!("{} songs on public page", songs.len())),
            None => CheckOutcome::fail("public songs response is not a list"),
        })
    }

    async fn unknown_musician(&self, session: &Session) -> HarnessResult<CheckOutcome> {
        let slug = format!("no-such-musician-{}", short_id());
        let response = session
            .send(ApiRequest::get(Endpoint::MusicianProfile(slug)))
            .await?;
        Ok(CheckOutcome::expect_status(&response, &[404], "unknown musician"))
    }
}

/// Profiles come back either bare or wrapped in a `musician` object.
fn profile_object(body: &Value) -> &Value {
    body.get("musician").unwrap_or(body)
}

fn leaked_fields(profile: &Value) -> Vec<&'static str> {
    PRIVATE_FIELDS
        .iter()
        .copied()
        .filter(|field| profile.get(*field).is_some_and(|v| !v.is_null()))
        .collect()
}

#[async_trait]
impl Suite for PublicSuite {
    fn name(&self) -> &'static str {
        "public"
    }

    fn description(&self) -> &'static str {
        "public musician page seen by the audience"
    }

    fn checks(&self) -> &'static [&'static str] {
        CHECKS
    }

    fn requires_auth(&self, check: &str) -> bool {
        check != "unknown_musician_404"
    }

    async fn run_check(
        &mut self,
        check: &str,
        session: &mut Session,
    ) -> HarnessResult<CheckOutcome> {
        match check {
            "public_profile" => self.public_profile(session).await,
            "public_profile_hides_private_fields" => self.hides_private_fields(session).await,
            "public_song_list" => self.public_song_list(session).await,
            "unknown_musician_404" => self.unknown_musician(session).await,
            _ => Err(unknown_check(self.name(), check)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::suites::test_support::{authed_session, session_for};
    use mockito::Matcher;
    use serde_json::json;

    #[test]
    fn test_leaked_fields() {
        let clean = json!({"name": "Ana", "slug": "ana", "email": null});
        assert!(leaked_fields(&clean).is_empty());

        let leaky = json!({"musician": {"slug": "ana", "email": "a@x", "password_hash": "h"}});
        assert_eq!(
            leaked_fields(profile_object(&leaky)),
            vec!["email", "password_hash"]
        );
    }

    #[tokio::test]
    async fn test_profile_checks_send_no_token() {
        let mut server = mockito::Server::new_async().await;
        let mut session = authed_session(&mut server).await;
        let _profile = server
            .mock("GET", "/api/musicians/ana")
            .match_header("authorization", Matcher::Missing)
            .with_status(200)
            .with_body(r#"{"name":"Ana","slug":"ana","bio":"Covers"}"#)
            .create_async()
            .await;
        let _songs = server
            .mock("GET", "/api/musicians/ana/songs")
            .match_header("authorization", Matcher::Missing)
            .with_status(200)
            .with_body(r#"{"songs":[]}"#)
            .create_async()
            .await;

        let mut suite = PublicSuite::new();
        for check in [
            "public_profile",
            "public_profile_hides_private_fields",
            "public_song_list",
        ] {
            let outcome = suite.run_check(check, &mut session).await.unwrap();
            assert!(outcome.success, "{}: {}", check, outcome.message);
        }
    }

    #[tokio::test]
    async fn test_unknown_musician() {
        let mut server = mockito::Server::new_async().await;
        let mut session = session_for(&server);
        let _missing = server
            .mock(
                "GET",
                Matcher::Regex(r"^/api/musicians/no-such-musician-\w+$".to_string()),
            )
            .with_status(404)
            .with_body(r#"{"detail":"Musician not found"}"#)
            .create_async()
            .await;

        let mut suite = PublicSuite::new();
        let outcome = suite
            .run_check("unknown_musician_404", &mut session)
            .await
            .unwrap();
        assert!(outcome.success, "{}", outcome.message);
    }
}
