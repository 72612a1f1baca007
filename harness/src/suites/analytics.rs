use crate::error::HarnessResult;
use crate::scenario::{describe, unknown_check, CheckOutcome, Suite};
use crate::session::Session;
use api::{ApiRequest, DailyAnalytics, Endpoint, RequesterStat};
use async_trait::async_trait;

const CHECKS: &[&str] = &[
    "daily_analytics_shape",
    "requesters_analytics_shape",
    "archived_requests_excluded",
];

const DAILY_FIELDS: &[&str] = &["total_requests", "daily_stats"];

#[derive(Default)]
pub struct AnalyticsSuite;

impl AnalyticsSuite {
    pub fn new() -> Self {
        Self
    }

    async fn daily(session: &Session) -> HarnessResult<Result<DailyAnalytics, String>> {
        let request = ApiRequest::get(Endpoint::AnalyticsDaily).with_query("days", "7");
        let response = session.send_authed(request).await?;
        if response.status != 200 {
            return Ok(Err(describe(&response)));
        }
        let missing = response.missing_fields(DAILY_FIELDS);
        if !missing.is_empty() {
            return Ok(Err(format!("daily analytics missing {:?}", missing)));
        }
        Ok(Ok(response.json()?))
    }

    async fn daily_analytics_shape(&self, session: &Session) -> HarnessResult<CheckOutcome> {
        Ok(match Self::daily(session).await? {
            Ok(daily) => CheckOutcome::pass(format!(
                "{} requests from {} requesters over {} days",
                daily.total_requests,
                daily.unique_requesters,
                daily.daily_stats.len()
            )),
            Err(reason) => CheckOutcome::fail(reason),
        })
    }

    async fn requesters_analytics_shape(&self, session: &Session) -> HarnessResult<CheckOutcome> {
        let response = session
            .send_authed(ApiRequest::get(Endpoint::AnalyticsRequesters))
            .await?;
        if response.status != 200 {
            return Ok(CheckOutcome::fail(describe(&response)));
        }

        let Some(items) = response.list(&["requesters"]) else {
            return Ok(CheckOutcome::fail("requesters response is not a list"));
        };
        let parsed: Result<Vec<RequesterStat>, _> = items
            .iter()
            .map(|item| serde_json::from_value(item.clone()))
            .collect();

        Ok(match parsed {
            Ok(stats) => CheckOutcome::pass(format!("{} requesters reported", stats.len())),
            Err(e) => CheckOutcome::fail(format!("requester entry has wrong shape: {}", e)),
        })
    }

    /// Totals before a new request, after it, and after archiving it. The
    /// last total must drop back below the middle one.
    async fn archived_requests_excluded(
        &self,
        session: &mut Session,
    ) -> HarnessResult<CheckOutcome> {
        let before = match Self::daily(session).await? {
            Ok(daily) => daily.total_requests,
            Err(reason) => return Ok(CheckOutcome::fail(reason)),
        };

        let request_id = session.submit_request_id("Smoke Analytics Fan").await?;

        let with_request = match Self::daily(session).await? {
            Ok(daily) => daily.total_requests,
            Err(reason) => return Ok(CheckOutcome::fail(reason)),
        };
        if with_request <= before {
            return Ok(CheckOutcome::fail(format!(
                "new request not counted: total stayed {} -> {}",
                before, with_request
            )));
        }

        let response = session.archive_request(&request_id).await?;
        if !response.is_success() {
            return Ok(CheckOutcome::fail(format!(
                "archiving request failed: {}",
                describe(&response)
            )));
        }

        let after = match Self::daily(session).await? {
            Ok(daily) => daily.total_requests,
            Err(reason) => return Ok(CheckOutcome::fail(reason)),
        };

        Ok(CheckOutcome::check(
            after < with_request,
            format!(
                "totals {} -> {} -> {} (archived request excluded)",
                before, with_request, after
            ),
            format!(
                "archived request still counted: totals {} -> {} -> {}",
                before, with_request, after
            ),
        ))
    }
}

#[async_trait]
impl Suite for AnalyticsSuite {
    fn name(&self) -> &'static str {
        "analytics"
    }

    fn description(&self) -> &'static str {
        "daily totals and requester analytics"
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
            "daily_analytics_shape" => self.daily_analytics_shape(session).await,
            "requesters_analytics_shape" => self.requesters_analytics_shape(session).await,
            "archived_requests_excluded" => self.archived_requests_excluded(session).await,
            _ => Err(unknown_check(self.name(), check)),
        }
    }
}
