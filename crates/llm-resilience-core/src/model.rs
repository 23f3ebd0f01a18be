//! Routing identifiers.
//!
//! The original Python service occasionally confused "physical" and "logical"
//! model names because both were plain `str`. These newtypes make that a type
//! error: the circuit breaker and rate limiter only ever accept a
//! [`PhysicalModel`], while the orchestrator's public API only ever accepts a
//! [`LogicalModel`].

use std::fmt;

macro_rules! string_newtype {
    ($name:ident) => {
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub struct $name(String);

        impl $name {
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }

            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self::new(value)
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self::new(value)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

string_newtype!(LogicalModel);
string_newtype!(PhysicalModel);
string_newtype!(Provider);

/// Identity under which QPM/concurrency are enforced (§3).
///
/// Multiple logical models can share one key: every Dashscope model shares
/// the Dashscope key, for example.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RateLimiterKey {
    pub provider: Provider,
    pub endpoint: Option<String>,
}

impl RateLimiterKey {
    pub fn new(provider: impl Into<Provider>, endpoint: Option<impl Into<String>>) -> Self {
        Self {
            provider: provider.into(),
            endpoint: endpoint.map(Into::into),
        }
    }

    /// The cache key prefix used for this limiter's persisted state (§6).
    pub fn cache_prefix(&self) -> String {
        match &self.endpoint {
            Some(endpoint) => format!("rate:{}:{}", self.provider, endpoint),
            None => format!("rate:{}", self.provider),
        }
    }
}

impl fmt::Display for RateLimiterKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.endpoint {
            Some(endpoint) => write!(f, "{}:{}", self.provider, endpoint),
            None => write!(f, "{}", self.provider),
        }
    }
}
