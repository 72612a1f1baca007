use crate::error::{HarnessError, HarnessResult};
use crate::session::Session;
use api::ApiResponse;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashSet;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckOutcome {
    pub success: bool,
    pub message: String,
}

impl CheckOutcome {
    pub fn pass(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }

    pub fn fail(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
        }
    }

    pub fn check(success: bool, pass: impl Into<String>, fail: impl Into<String>) -> Self {
        if success {
            Self::pass(pass)
        } else {
            Self::fail(fail)
        }
    }

    /// Passes when the response status is one of `accepted`.
    pub fn expect_status(response: &ApiResponse, accepted: &[u16], what: &str) -> Self {
        Self::check(
            accepted.contains(&response.status),
            format!("{} returned {}", what, response.status),
            format!(
                "{} expected {:?}, got {}",
                what,
                accepted,
                describe(response)
            ),
        )
    }
}

/// One family of checks, run in the order `checks()` lists them.
#[async_trait]
pub trait Suite: Send {
    fn name(&self) -> &'static str;

    fn description(&self) -> &'static str;

    fn checks(&self) -> &'static [&'static str];

    fn requires_auth(&self, _check: &str) -> bool {
        true
    }

    async fn run_check(&mut self, check: &str, session: &mut Session)
        -> HarnessResult<CheckOutcome>;
}

pub fn unknown_check(suite: &str, check: &str) -> HarnessError {
    HarnessError::UnknownCheck {
        suite: suite.to_string(),
        check: check.to_string(),
    }
}

pub struct SuiteRegistry {
    suites: Vec<Box<dyn Suite>>,
}

impl SuiteRegistry {
    pub fn new() -> Self {
        Self { suites: Vec::new() }
    }

    pub fn register(&mut self, suite: Box<dyn Suite>) {
        self.suites.retain(|s| s.name() != suite.name());
        self.suites.push(suite);
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.suites.iter().map(|s| s.name()).collect()
    }

    pub fn get(&self, name: &str) -> Option<&dyn Suite> {
        self.suites
            .iter()
            .find(|s| s.name() == name)
            .map(|s| s.as_ref())
    }

    pub fn iter(&self) -> impl Iterator<Item = &dyn Suite> {
        self.suites.iter().map(|s| s.as_ref())
    }

    pub fn len(&self) -> usize {
        self.suites.len()
    }

    pub fn is_empty(&self) -> bool {
        self.suites.is_empty()
    }

    /// Suites matching `names` in registration order, or all of them when
    /// `names` is empty.
    pub fn select_mut(&mut self, names: &[String]) -> HarnessResult<Vec<&mut Box<dyn Suite>>> {
        for name in names {
            if self.get(name).is_none() {
                return Err(HarnessError::UnknownSuite { name: name.clone() });
            }
        }

        Ok(self
            .suites
            .iter_mut()
            .filter(|s| names.is_empty() || names.iter().any(|n| n == s.name()))
            .collect())
    }
}

impl Default for SuiteRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Status plus the backend's error text, for failure messages.
pub fn describe(response: &ApiResponse) -> String {
    let mut detail = response.error_message();
    if detail.len() > 200 {
        let mut cut = 200;
        while !detail.is_char_boundary(cut) {
            cut -= 1;
        }
        detail.truncate(cut);
        detail.push_str("...");
    }
    if detail.is_empty() {
        format!("status {}", response.status)
    } else {
        format!("status {} ({})", response.status, detail)
    }
}

/// Ids come back as strings from some endpoints and numbers from others.
pub fn item_id(item: &Value) -> Option<String> {
    ["id", "_id", "request_id"]
        .iter()
        .find_map(|k| item.get(*k))
        .and_then(|v| match v {
            Value::String(s) if !s.is_empty() => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        })
}

pub fn ids_of(items: &[Value]) -> Vec<String> {
    items.iter().filter_map(item_id).collect()
}

/// Ids present in `after` but not in `before`, in `after` order.
pub fn new_ids(before: &[Value], after: &[Value]) -> Vec<String> {
    let seen: HashSet<String> = ids_of(before).into_iter().collect();
    ids_of(after)
        .into_iter()
        .filter(|id| !seen.contains(id))
        .collect()
}

pub fn string_list(items: &[Value]) -> Vec<String> {
    items
        .iter()
        .filter_map(|v| match v {
            Value::String(s) => Some(s.clone()),
            other => other
                .get("name")
                .and_then(Value::as_str)
                .map(str::to_string),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::time::Duration;

    struct NamedSuite(&'static str);

    #[async_trait]
    impl Suite for NamedSuite {
        fn name(&self) -> &'static str {
            self.0
        }

        fn description(&self) -> &'static str {
            "test suite"
        }

        fn checks(&self) -> &'static [&'static str] {
            &["only"]
        }

        async fn run_check(
            &mut self,
            check: &str,
            _session: &mut Session,
        ) -> HarnessResult<CheckOutcome> {
            Err(unknown_check(self.name(), check))
        }
    }

    #[test]
    fn test_registry_selection() {
        let mut registry = SuiteRegistry::new();
        registry.register(Box::new(NamedSuite("auth")));
        registry.register(Box::new(NamedSuite("songs")));
        registry.register(Box::new(NamedSuite("auth")));

        assert_eq!(registry.names(), vec!["songs", "auth"]);
        assert_eq!(registry.select_mut(&[]).unwrap().len(), 2);

        let selected = registry.select_mut(&["auth".to_string()]).unwrap();
        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0].name(), "auth");

        assert!(matches!(
            registry.select_mut(&["billing".to_string()]),
            Err(HarnessError::UnknownSuite { .. })
        ));
    }

    #[test]
    fn test_item_id_variants() {
        assert_eq!(item_id(&json!({"id": "a"})), Some("a".to_string()));
        assert_eq!(item_id(&json!({"id": 7})), Some("7".to_string()));
        assert_eq!(item_id(&json!({"_id": "b"})), Some("b".to_string()));
        assert_eq!(item_id(&json!({"id": ""})), None);
        assert_eq!(item_id(&json!({"title": "x"})), None);
    }

    #[test]
    fn test_new_ids_is_set_difference() {
        let before = vec![json!({"id": "r1"}), json!({"id": "r2"})];
        let after = vec![
            json!({"id": "r3"}),
            json!({"id": "r1"}),
            json!({"id": "r2"}),
            json!({"id": "r4"}),
        ];
        assert_eq!(new_ids(&before, &after), vec!["r3", "r4"]);
        assert!(new_ids(&after, &before).is_empty());
    }

    #[test]
    fn test_string_list_accepts_objects() {
        let items = vec![json!("Rock"), json!({"name": "Jazz"}), json!(3)];
        assert_eq!(string_list(&items), vec!["Rock", "Jazz"]);
    }

    #[test]
    fn test_expect_status_outcome() {
        let response =
            ApiResponse::from_parts(500, r#"{"detail":"boom"}"#, Duration::from_millis(1));
        let outcome = CheckOutcome::expect_status(&response, &[400], "checkout");
        assert!(!outcome.success);
        assert_eq!(outcome.message, "checkout expected [400], got status 500 (boom)");

        let ok = ApiResponse::from_parts(400, "{}", Duration::ZERO);
        assert!(CheckOutcome::expect_status(&ok, &[400], "checkout").success);
    }
}
