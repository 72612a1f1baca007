use crate::error::{HarnessError, HarnessResult};
use crate::scenario::{describe, item_id, unknown_check, CheckOutcome, Suite};
use crate::session::Session;
use api::{ApiRequest, Endpoint, RequestStatus, SongRequest};
use async_trait::async_trait;
use serde_json::json;

const CHECKS: &[&str] = &[
    "submit_public_request",
    "request_visible_to_musician",
    "accept_request",
    "mark_request_played",
    "invalid_status_rejected",
    "archive_request",
];

#[derive(Default)]
pub struct RequestsSuite {
    request_id: Option<String>,
}

impl RequestsSuite {
    pub fn new() -> Self {
        Self::default()
    }

    fn request_id(&self) -> HarnessResult<&str> {
        self.request_id
            .as_deref()
            .ok_or_else(|| HarnessError::precondition("no request was submitted"))
    }

    async fn submit_public_request(
        &mut self,
        session: &mut Session,
    ) -> HarnessResult<CheckOutcome> {
        let song_id = session.ensure_song().await?;
        let response = session.submit_request(&song_id, "Smoke Fan").await?;

        if !matches!(response.status, 200 | 201) {
            return Ok(CheckOutcome::fail(format!(
                "public request rejected: {}",
                describe(&response)
            )));
        }

        match item_id(&response.body) {
            Some(id) => {
                self.request_id = Some(id.clone());
                Ok(CheckOutcome::pass(format!("request {} submitted", id)))
            }
            None => Ok(CheckOutcome::fail("request accepted but no id returned")),
        }
    }

    async fn request_visible_to_musician(
        &self,
        session: &Session,
    ) -> HarnessResult<CheckOutcome> {
        let id = self.request_id()?;
        let Some(request) = find_request(session, id).await? else {
            return Ok(CheckOutcome::fail(format!(
                "request {} not in musician's list",
                id
            )));
        };
        Ok(CheckOutcome::check(
            request.status == RequestStatus::Pending,
            format!("request {} listed as pending", id),
            format!("request {} listed as {}", id, request.status),
        ))
    }

    async fn transition(
        &self,
        session: &Session,
        status: RequestStatus,
    ) -> HarnessResult<CheckOutcome> {
        let id = self.request_id()?;
        let response = session.set_request_status(id, status).await?;
        if response.status != 200 {
            return Ok(CheckOutcome::fail(format!(
                "moving {} to {} failed: {}",
                id,
                status,
                describe(&response)
            )));
        }

        let reported = response
            .field("status")
            .and_then(|s| serde_json::from_value::<RequestStatus>(s.clone()).ok());
        Ok(CheckOutcome::check(
            reported.map_or(true, |s| s == status),
            format!("request {} is {}", id, status),
            format!("request {} reported status {:?}", id, reported),
        ))
    }

    async fn invalid_status_rejected(&self, session: &Session) -> HarnessResult<CheckOutcome> {
        let id = self.request_id()?.to_string();
        let request = ApiRequest::put(Endpoint::RequestStatus(id))
            .with_json(json!({ "status": "definitely-not-a-status" }));
        let response = session.send_authed(request).await?;
        Ok(CheckOutcome::expect_status(
            &response,
            &[400, 422],
            "invalid status update",
        ))
    }

    async fn archive_request(&self, session: &mut Session) -> HarnessResult<CheckOutcome> {
        let outcome = self.transition(session, RequestStatus::Archived).await?;
        if !outcome.success {
            return Ok(outcome);
        }

        let id = self.request_id()?;
        session.forget_request(id);
        Ok(match find_request(session, id).await? {
            None => CheckOutcome::pass(format!("request {} archived and hidden", id)),
            Some(r) if r.status == RequestStatus::Archived => {
                CheckOutcome::pass(format!("request {} archived", id))
            }
            Some(r) => CheckOutcome::fail(format!(
                "request {} still listed as {} after archiving",
                id, r.status
            )),
        })
    }
}

/// Looks a request up in the musician's own request list.
pub(crate) async fn find_request(
    session: &Session,
    id: &str,
) -> HarnessResult<Option<SongRequest>> {
    let response = session
        .send_authed(ApiRequest::get(Endpoint::Requests))
        .await?;
    response.expect_success()?;

    let Some(items) = response.list(&["requests"]) else {
        return Ok(None);
    };
    match items.iter().find(|r| item_id(r).as_deref() == Some(id)) {
        Some(raw) => Ok(Some(serde_json::from_value(raw.clone())?)),
        None => Ok(None),
    }
}

#[async_trait]
impl Suite for RequestsSuite {
    fn name(&self) -> &'static str {
        "requests"
    }

    fn description(&self) -> &'static str {
        "audience song requests and their status lifecycle"
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
            "submit_public_request" => self.submit_public_request(session).await,
            "request_visible_to_musician" => self.request_visible_to_musician(session).await,
            "accept_request" => self.transition(session, RequestStatus::Accepted).await,
            "mark_request_played" => self.transition(session, RequestStatus::Played).await,
            "invalid_status_rejected" => self.invalid_status_rejected(session).await,
            "archive_request" => self.archive_request(session).await,
            _ => Err(unknown_check(self.name(), check)),
        }
    }
}
