//! Explicit per-request session passed into service calls.

use uuid::Uuid;

use crate::utils::constant_time_eq;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Actor {
    Admin,
    Anonymous,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestContext {
    pub request_id: String,
    pub actor: Actor,
}

impl RequestContext {
    pub fn new(request_id: impl Into<String>, actor: Actor) -> Self {
        Self {
            request_id: request_id.into(),
            actor,
        }
    }

    pub fn admin() -> Self {
        Self::new(Uuid::new_v4().to_string(), Actor::Admin)
    }

    pub fn anonymous() -> Self {
        Self::new(Uuid::new_v4().to_string(), Actor::Anonymous)
    }

    pub fn is_admin(&self) -> bool {
        self.actor == Actor::Admin
    }

    /// Resolves the actor from an `Authorization` header value. Accepts
    /// `Bearer <key>` or the bare key.
    pub fn actor_from_authorization(header: Option<&str>, admin_api_key: &str) -> Actor {
        if admin_api_key.is_empty() {
            return Actor::Anonymous;
        }
        let presented = match header {
            Some(value) => value.strip_prefix("Bearer ").unwrap_or(value),
            None => return Actor::Anonymous,
        };
        if constant_time_eq(presented.as_bytes(), admin_api_key.as_bytes()) {
            Actor::Admin
        } else {
            Actor::Anonymous
        }
    }
}
