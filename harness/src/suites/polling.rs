use crate::error::HarnessResult;
use crate::scenario::{describe, new_ids, unknown_check, CheckOutcome, Suite};
use crate::session::Session;
use api::{ApiRequest, Endpoint, RequestUpdates};
use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

const CHECKS: &[&str] = &["updates_endpoint_shape", "new_request_appears_in_updates"];

#[derive(Default)]
pub struct PollingSuite;

impl PollingSuite {
    pub fn new() -> Self {
        Self
    }

    async fn poll(session: &Session) -> HarnessResult<Result<Vec<Value>, String>> {
        let musician_id = session.musician_id()?.to_string();
        let response = session
            .send_authed(ApiRequest::get(Endpoint::RequestUpdates(musician_id)))
            .await?;
        if response.status != 200 {
            return Ok(Err(describe(&response)));
        }
        Ok(match response.list(&["requests"]) {
            Some(items) => Ok(items.clone()),
            None => Err("updates response has no request list".to_string()),
        })
    }

    async fn updates_endpoint_shape(&self, session: &Session) -> HarnessResult<CheckOutcome> {
        let musician_id = session.musician_id()?.to_string();
        let response = session
            .send_authed(ApiRequest::get(Endpoint::RequestUpdates(musician_id)))
            .await?;
        if response.status != 200 {
            return Ok(CheckOutcome::fail(describe(&response)));
        }

        if response.body.is_array() {
            let count = response.list(&[]).map_or(0, Vec::len);
            return Ok(CheckOutcome::pass(format!("{} requests in updates", count)));
        }
        Ok(match response.json::<RequestUpdates>() {
            Ok(updates) if response.field("requests").is_some() => CheckOutcome::pass(format!(
                "{} requests in updates (last updated {})",
                updates.requests.len(),
                updates.last_updated.as_deref().unwrap_or("unknown")
            )),
            Ok(_) => CheckOutcome::fail("updates response has no request list"),
            Err(e) => CheckOutcome::fail(format!("updates response has wrong shape: {}", e)),
        })
    }

    async fn new_request_appears_in_updates(
        &self,
        session: &mut Session,
    ) -> HarnessResult<CheckOutcome> {
        let before = match Self::poll(session).await? {
            Ok(items) => items,
            Err(reason) => return Ok(CheckOutcome::fail(reason)),
        };

        let request_id = session.submit_request_id("Smoke Polling Fan").await?;
        let interval = session.options().poll_interval;
        let attempts = session.options().poll_attempts;

        for attempt in 1..=attempts {
            tokio::time::sleep(interval).await;
            let after = match Self::poll(session).await? {
                Ok(items) => items,
                Err(reason) => return Ok(CheckOutcome::fail(reason)),
            };

            let fresh = new_ids(&before, &after);
            debug!("Poll {}: {} new requests", attempt, fresh.len());
            if fresh.contains(&request_id) {
                return Ok(CheckOutcome::pass(format!(
                    "request {} appeared after {} poll(s)",
                    request_id, attempt
                )));
            }
        }

        Ok(CheckOutcome::fail(format!(
            "request {} did not appear after {} polls",
            request_id, attempts
        )))
    }
}

#[async_trait]
impl Suite for PollingSuite {
    fn name(&self) -> &'static str {
        "polling"
    }

    fn description(&self) -> &'static str {
        "live request updates feed"
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
            "updates_endpoint_shape" => self.updates_endpoint_shape(session).await,
            "new_request_appears_in_updates" => {
                self.new_request_appears_in_updates(session).await
            }
            _ => Err(unknown_check(self.name(), check)),
        }
    }
}
