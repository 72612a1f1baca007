use crate::error::HarnessResult;
use crate::scenario::{describe, unknown_check, CheckOutcome, Suite};
use crate::session::Session;
use api::{ApiRequest, CheckoutRequest, CheckoutSession, Endpoint, SubscriptionStatus};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use regex::Regex;
use serde_json::json;
use std::sync::LazyLock;

const CHECKS: &[&str] = &[
    "subscription_status_shape",
    "trial_length_at_most_14_days",
    "checkout_valid_plan",
    "checkout_invalid_plan_is_400",
    "webhook_rejects_unsigned",
];

const STATUS_FIELDS: &[&str] = &["plan", "trial_active"];
const MAX_TRIAL_DAYS: i64 = 14;
static STRIPE_CHECKOUT_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^https://checkout\.stripe\.com/").expect("checkout url pattern compiles")
});

#[derive(Default)]
pub struct SubscriptionSuite;

impl SubscriptionSuite {
    pub fn new() -> Self {
        Self
    }

    async fn status(session: &Session) -> HarnessResult<Result<SubscriptionStatus, String>> {
        let response = session
            .send_authed(ApiRequest::get(Endpoint::SubscriptionStatus))
            .await?;
        if response.status != 200 {
            return Ok(Err(describe(&response)));
        }
        let missing = response.missing_fields(STATUS_FIELDS);
        if !missing.is_empty() {
            return Ok(Err(format!("subscription status missing {:?}", missing)));
        }
        Ok(response
            .json::<SubscriptionStatus>()
            .map_err(|e| format!("subscription status has wrong shape: {}", e)))
    }

    fn checkout_request(session: &Session, plan: &str) -> CheckoutRequest {
        let base = session.client().base_url();
        CheckoutRequest {
            plan: plan.to_string(),
            success_url: format!("{}/dashboard?checkout=success", base),
            cancel_url: format!("{}/dashboard?checkout=cancelled", base),
        }
    }

    async fn subscription_status_shape(&self, session: &Session) -> HarnessResult<CheckOutcome> {
        Ok(match Self::status(session).await? {
            Ok(status) => CheckOutcome::pass(format!(
                "plan {}, trial active: {}",
                status.plan, status.trial_active
            )),
            Err(reason) => CheckOutcome::fail(reason),
        })
    }

    async fn trial_length(&self, session: &Session) -> HarnessResult<CheckOutcome> {
        let status = match Self::status(session).await? {
            Ok(status) => status,
            Err(reason) => return Ok(CheckOutcome::fail(reason)),
        };
        if !status.trial_active {
            return Ok(CheckOutcome::pass(format!("not on trial (plan {})", status.plan)));
        }
        Ok(trial_outcome(&status, Utc::now()))
    }

    async fn checkout_valid_plan(&self, session: &Session) -> HarnessResult<CheckOutcome> {
        let plan = session.options().checkout_plan.clone();
        let payload = Self::checkout_request(session, &plan);
        let response = session
            .send_authed(ApiRequest::post(Endpoint::SubscriptionCheckout).with_body(&payload)?)
            .await?;
        if response.status != 200 {
            return Ok(CheckOutcome::fail(format!(
                "checkout for plan {} failed: {}",
                plan,
                describe(&response)
            )));
        }

        let session_info: CheckoutSession = match response.json() {
            Ok(info) => info,
            Err(e) => {
                return Ok(CheckOutcome::fail(format!(
                    "checkout response has no url: {}",
                    e
                )))
            }
        };
        Ok(CheckOutcome::check(
            STRIPE_CHECKOUT_URL.is_match(&session_info.url),
            format!("plan {} checkout at {}", plan, session_info.url),
            format!("checkout url {} is not a Stripe checkout page", session_info.url),
        ))
    }

    async fn checkout_invalid_plan(&self, session: &Session) -> HarnessResult<CheckOutcome> {
        let payload = Self::checkout_request(session, "not-a-plan");
        let response = session
            .send_authed(ApiRequest::post(Endpoint::SubscriptionCheckout).with_body(&payload)?)
            .await?;
        Ok(CheckOutcome::expect_status(
            &response,
            &[400],
            "checkout with unknown plan",
        ))
    }

    async fn webhook_rejects_unsigned(&self, session: &Session) -> HarnessResult<CheckOutcome> {
        let event = json!({
            "id": "evt_smoke_unsigned",
            "type": "checkout.session.completed",
            "data": { "object": { "id": "cs_smoke" } }
        });
        let request = ApiRequest::post(Endpoint::StripeWebhook)
            .with_header("stripe-signature", "invalid")
            .with_json(event);
        let response = session.send(request).await?;
        Ok(CheckOutcome::expect_status(&response, &[400], "unsigned webhook"))
    }
}

/// Judges an active trial against the 14 day ceiling, preferring the
/// backend's own day count over the end timestamp.
fn trial_outcome(status: &SubscriptionStatus, now: DateTime<Utc>) -> CheckOutcome {
    if let Some(days) = status.days_remaining {
        return CheckOutcome::check(
            (0..=MAX_TRIAL_DAYS).contains(&days),
            format!("trial has {} days remaining", days),
            format!("trial reports {} days remaining, limit is {}", days, MAX_TRIAL_DAYS),
        );
    }

    let Some(ends_at) = status.trial_ends_at.as_deref() else {
        return CheckOutcome::fail("trial active but no end date reported");
    };
    let ends = match DateTime::parse_from_rfc3339(ends_at) {
        Ok(ends) => ends.with_timezone(&Utc),
        Err(e) => return CheckOutcome::fail(format!("trial end {:?} unparseable: {}", ends_at, e)),
    };

    let left = ends - now;
    CheckOutcome::check(
        left <= Duration::days(MAX_TRIAL_DAYS),
        format!("trial ends {} ({}h left)", ends_at, left.num_hours()),
        format!("trial ends {}, more than {} days away", ends_at, MAX_TRIAL_DAYS),
    )
}

#[async_trait]
impl Suite for SubscriptionSuite {
    fn name(&self) -> &'static str {
        "subscription"
    }

    fn description(&self) -> &'static str {
        "trial status, Stripe checkout and webhook signing"
    }

    fn checks(&self) -> &'static [&'static str] {
        CHECKS
    }

    fn requires_auth(&self, check: &str) -> bool {
        check != "webhook_rejects_unsigned"
    }

    async fn run_check(
        &mut self,
        check: &str,
        session: &mut Session,
    ) -> HarnessResult<CheckOutcome> {
        match check {
            "subscription_status_shape" => self.subscription_status_shape(session).await,
            "trial_length_at_most_14_days" => self.trial_length(session).await,
            "checkout_valid_plan" => self.checkout_valid_plan(session).await,
            "checkout_invalid_plan_is_400" => self.checkout_invalid_plan(session).await,
            "webhook_rejects_unsigned" => self.webhook_rejects_unsigned(session).await,
            _ => Err(unknown_check(self.name(), check)),
        }
    }
}
