use crate::error::HarnessResult;
use crate::scenario::{describe, unknown_check, CheckOutcome, Suite};
use crate::session::{short_id, Session};
use api::{
    ApiError, ApiRequest, Credentials, Endpoint, ForgotPasswordRequest, RegisterRequest,
    ResetPasswordRequest,
};
use async_trait::async_trait;
use serde_json::json;
use tracing::debug;

const CHECKS: &[&str] = &[
    "login_valid_credentials",
    "login_wrong_password",
    "login_missing_fields",
    "register_new_musician",
    "register_duplicate_email",
    "forgot_password_unknown_email",
    "reset_password_invalid_token",
    "protected_endpoint_without_token",
];

#[derive(Default)]
pub struct AuthSuite {
    registered_email: Option<String>,
}

impl AuthSuite {
    pub fn new() -> Self {
        Self::default()
    }

    async fn login_valid_credentials(&self, session: &Session) -> HarnessResult<CheckOutcome> {
        match session.client().login(session.credentials()).await {
            Ok(auth) => Ok(CheckOutcome::check(
                !auth.token.is_empty() && auth.musician.is_some(),
                "login returned token and musician",
                "login response missing token or musician",
            )),
            Err(ApiError::UnexpectedStatus { status, body }) => Ok(CheckOutcome::fail(format!(
                "login rejected with {}: {}",
                status, body
            ))),
            Err(e) => Err(e.into()),
        }
    }

    async fn login_wrong_password(&self, session: &Session) -> HarnessResult<CheckOutcome> {
        let wrong = Credentials::new(
            session.credentials().email.clone(),
            format!("{}-wrong", session.credentials().password),
        );
        let response = session
            .send(ApiRequest::post(Endpoint::Login).with_body(&wrong)?)
            .await?;
        Ok(CheckOutcome::expect_status(&response, &[401], "login with wrong password"))
    }

    async fn login_missing_fields(&self, session: &Session) -> HarnessResult<CheckOutcome> {
        let request = ApiRequest::post(Endpoint::Login)
            .with_json(json!({ "email": session.credentials().email }));
        let response = session.send(request).await?;
        Ok(CheckOutcome::expect_status(
            &response,
            &[400, 422],
            "login without password",
        ))
    }

    async fn register_new_musician(&mut self, session: &Session) -> HarnessResult<CheckOutcome> {
        let tag = short_id();
        let payload = RegisterRequest {
            name: format!("Smoke Musician {}", tag),
            email: format!("smoke+{}@requestwave.test", tag),
            password: format!("Smoke-{}-Pass!", tag),
        };
        debug!("Registering {}", payload.email);

        let response = session
            .send(ApiRequest::post(Endpoint::Register).with_body(&payload)?)
            .await?;

        if !matches!(response.status, 200 | 201) {
            return Ok(CheckOutcome::fail(format!(
                "registration rejected: {}",
                describe(&response)
            )));
        }

        self.registered_email = Some(payload.email.clone());
        let has_identity = response.field("token").is_some()
            || response.field("access_token").is_some()
            || response.field("musician").is_some()
            || response.field("id").is_some();
        Ok(CheckOutcome::check(
            has_identity,
            format!("registered {}", payload.email),
            "registration succeeded without token or musician in body",
        ))
    }

    async fn register_duplicate_email(&self, session: &Session) -> HarnessResult<CheckOutcome> {
        let email = self
            .registered_email
            .clone()
            .unwrap_or_else(|| session.credentials().email.clone());
        let payload = RegisterRequest {
            name: "Duplicate Smoke Musician".to_string(),
            email,
            password: format!("Smoke-{}-Pass!", short_id()),
        };

        let response = session
            .send(ApiRequest::post(Endpoint::Register).with_body(&payload)?)
            .await?;
        Ok(CheckOutcome::expect_status(
            &response,
            &[400, 409],
            "duplicate registration",
        ))
    }

    async fn forgot_password_unknown_email(
        &self,
        session: &Session,
    ) -> HarnessResult<CheckOutcome> {
        let payload = ForgotPasswordRequest {
            email: format!("nobody+{}@requestwave.test", short_id()),
        };
        let response = session
            .send(ApiRequest::post(Endpoint::ForgotPassword).with_body(&payload)?)
            .await?;
        Ok(CheckOutcome::expect_status(
            &response,
            &[200],
            "forgot-password for unknown email",
        ))
    }

    async fn reset_password_invalid_token(
        &self,
        session: &Session,
    ) -> HarnessResult<CheckOutcome> {
        let payload = ResetPasswordRequest {
            token: format!("invalid-{}", short_id()),
            new_password: format!("Smoke-{}-Pass!", short_id()),
        };
        let response = session
            .send(ApiRequest::post(Endpoint::ResetPassword).with_body(&payload)?)
            .await?;
        Ok(CheckOutcome::expect_status(
            &response,
            &[400],
            "reset-password with invalid token",
        ))
    }

    async fn protected_endpoint_without_token(
        &self,
        session: &Session,
    ) -> HarnessResult<CheckOutcome> {
        let response = session.send(ApiRequest::get(Endpoint::Songs)).await?;
        Ok(CheckOutcome::expect_status(
            &response,
            &[401, 403],
            "songs without token",
        ))
    }
}

#[async_trait]
impl Suite for AuthSuite {
    fn name(&self) -> &'static str {
        "auth"
    }

    fn description(&self) -> &'static str {
        "login, registration and password reset"
    }

    fn checks(&self) -> &'static [&'static str] {
        CHECKS
    }

    fn requires_auth(&self, _check: &str) -> bool {
        false
    }

    async fn run_check(
        &mut self,
        check: &str,
        session: &mut Session,
    ) -> HarnessResult<CheckOutcome> {
        match check {
            "login_valid_credentials" => self.login_valid_credentials(session).await,
            "login_wrong_password" => self.login_wrong_password(session).await,
            "login_missing_fields" => self.login_missing_fields(session).await,
            "register_new_musician" => self.register_new_musician(session).await,
            "register_duplicate_email" => self.register_duplicate_email(session).await,
            "forgot_password_unknown_email" => self.forgot_password_unknown_email(session).await,
            "reset_password_invalid_token" => self.reset_password_invalid_token(session).await,
            "protected_endpoint_without_token" => {
                self.protected_endpoint_without_token(session).await
            }
            _ => Err(unknown_check(self.name(), check)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::HarnessError;
    use crate::suites::test_support::{session_for, LOGIN_BODY};
    use mockito::Matcher;

    #[tokio::test]
    async fn test_login_checks() {
        let mut server = mockito::Server::new_async().await;
        let _ok = server
            .mock("POST", "/api/auth/login")
            .match_body(Matcher::PartialJson(json!({"password": "pw"})))
            .with_status(200)
            .with_body(LOGIN_BODY)
            .create_async()
            .await;
        let _wrong = server
            .mock("POST", "/api/auth/login")
            .match_body(Matcher::PartialJson(json!({"password": "pw-wrong"})))
            .with_status(401)
            .with_body(r#"{"detail":"Invalid credentials"}"#)
            .create_async()
            .await;
        let _missing = server
            .mock("POST", "/api/auth/login")
            .match_body(Matcher::Json(json!({"email": "ana@example.com"})))
            .with_status(422)
            .create_async()
            .await;

        let mut session = session_for(&server);
        let mut suite = AuthSuite::new();

        for check in [
            "login_valid_credentials",
            "login_wrong_password",
            "login_missing_fields",
        ] {
            let outcome = suite.run_check(check, &mut session).await.unwrap();
            assert!(outcome.success, "{}: {}", check, outcome.message);
        }
    }

    #[tokio::test]
    async fn test_registration_then_duplicate() {
        let mut server = mockito::Server::new_async().await;
        let _register = server
            .mock("POST", "/api/auth/register")
            .match_body(Matcher::PartialJson(json!({"name": "Duplicate Smoke Musician"})))
            .with_status(400)
            .with_body(r#"{"detail":"Email already registered"}"#)
            .create_async()
            .await;
        let _fresh = server
            .mock("POST", "/api/auth/register")
            .match_body(Matcher::Regex("Smoke Musician [0-9a-f]+".to_string()))
            .with_status(201)
            .with_body(r#"{"token":"t2","musician":{"id":"m2"}}"#)
            .create_async()
            .await;

        let mut session = session_for(&server);
        let mut suite = AuthSuite::new();

        let outcome = suite
            .run_check("register_new_musician", &mut session)
            .await
            .unwrap();
        assert!(outcome.success, "{}", outcome.message);
        assert!(suite.registered_email.is_some());

        let outcome = suite
            .run_check("register_duplicate_email", &mut session)
            .await
            .unwrap();
        assert!(outcome.success, "{}", outcome.message);
    }

    #[tokio::test]
    async fn test_password_reset_checks() {
        let mut server = mockito::Server::new_async().await;
        let _forgot = server
            .mock("POST", "/api/auth/forgot-password")
            .with_status(200)
            .with_body(r#"{"message":"If the email exists, a link was sent"}"#)
            .create_async()
            .await;
        let _reset = server
            .mock("POST", "/api/auth/reset-password")
            .with_status(500)
            .with_body(r#"{"detail":"Internal Server Error"}"#)
            .create_async()
            .await;

        let mut session = session_for(&server);
        let mut suite = AuthSuite::new();

        let forgot = suite
            .run_check("forgot_password_unknown_email", &mut session)
            .await
            .unwrap();
        assert!(forgot.success);

        let reset = suite
            .run_check("reset_password_invalid_token", &mut session)
            .await
            .unwrap();
        assert!(!reset.success);
        assert!(reset.message.contains("status 500"));
    }

    #[tokio::test]
    async fn test_protected_endpoint_and_unknown_check() {
        let mut server = mockito::Server::new_async().await;
        let _songs = server
            .mock("GET", "/api/songs")
            .with_status(401)
            .create_async()
            .await;

        let mut session = session_for(&server);
        let mut suite = AuthSuite::new();

        let outcome = suite
            .run_check("protected_endpoint_without_token", &mut session)
            .await
            .unwrap();
        assert!(outcome.success);

        assert!(matches!(
            suite.run_check("nope", &mut session).await,
            Err(HarnessError::UnknownCheck { .. })
        ));
    }
}
