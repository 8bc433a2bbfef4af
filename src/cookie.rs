//! The cookie transport the store reads identifiers from and writes them to.

use std::collections::HashMap;

/// Request-scoped access to cookies and the application's cookie policy.
///
/// Implement this over whatever request/response types the web framework
/// provides. [`MemoryCookieJar`] is a ready-made implementation.
pub trait CookieJar: Send {
    /// Value of the request cookie `name`, if any.
    fn cookie(&self, name: &str) -> Option<String>;

    /// Queues a response cookie. A negative `max_age` expires it immediately,
    /// zero makes it a browser-session cookie.
    fn set_cookie(&mut self, name: &str, value: &str, max_age: i64);

    /// Max-age from the per-request cookie policy, in seconds.
    ///
    /// Negative asks for the session to be deleted on save; zero defers to
    /// the store's configured max-age.
    fn max_age(&self) -> i64;
}

/// A response cookie queued by the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetCookie {
    /// Cookie name.
    pub name: String,
    /// Encoded value, empty when clearing.
    pub value: String,
    /// Max-age in seconds.
    pub max_age: i64,
}

/// A cookie jar held entirely in memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryCookieJar {
    request: HashMap<String, String>,
    response: Vec<SetCookie>,
    max_age: i64,
}

impl MemoryCookieJar {
    /// Creates an empty jar with a zero max-age policy.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a request cookie.
    pub fn with_cookie(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.request.insert(name.into(), value.into());
        self
    }

    /// Sets the per-request max-age policy.
    pub fn with_max_age(mut self, max_age: i64) -> Self {
        self.max_age = max_age;
        self
    }

    /// Response cookies in the order they were set.
    pub fn response_cookies(&self) -> &[SetCookie] {
        &self.response
    }

    /// The last response cookie set under `name`.
    pub fn response_cookie(&self, name: &str) -> Option<&SetCookie> {
        self.response.iter().rev().find(|c| c.name == name)
    }

    /// Builds the jar for a follow-up request: live response cookies become
    /// request cookies, expired ones are dropped.
    pub fn next_request(&self) -> Self {
        let mut request = self.request.clone();
        for cookie in &self.response {
            if cookie.max_age < 0 {
                request.remove(&cookie.name);
            } else {
                request.insert(cookie.name.clone(), cookie.value.clone());
            }
        }
        Self {
            request,
            response: Vec::new(),
            max_age: self.max_age,
        }
    }
}

impl CookieJar for MemoryCookieJar {
    fn cookie(&self, name: &str) -> Option<String> {
        self.request.get(name).cloned()
    }

    fn set_cookie(&mut self, name: &str, value: &str, max_age: i64) {
        self.response.push(SetCookie {
            name: name.to_string(),
            value: value.to_string(),
            max_age,
        });
    }

    fn max_age(&self) -> i64 {
        self.max_age
    }
}
