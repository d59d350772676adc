use sha2::{Digest, Sha512};

use super::GatewayNotification;
use crate::utils::constant_time_eq;

/// Checks `signature_key` on gateway notifications:
/// `hex(sha512(order_id + status_code + gross_amount + server_key))`.
#[derive(Clone)]
pub struct NotificationVerifier {
    server_key: String,
}

impl NotificationVerifier {
    pub fn new(server_key: impl Into<String>) -> Self {
        Self {
            server_key: server_key.into(),
        }
    }

    pub fn signature(&self, order_id: &str, status_code: &str, gross_amount: &str) -> String {
        let mut hasher = Sha512::new();
        hasher.update(order_id.as_bytes());
        hasher.update(status_code.as_bytes());
        hasher.update(gross_amount.as_bytes());
        hasher.update(self.server_key.as_bytes());
        hex::encode(hasher.finalize())
    }

    pub fn verify(&self, notification: &GatewayNotification) -> bool {
        let expected = self.signature(
            &notification.order_id,
            &notification.status_code,
            &notification.gross_amount,
        );
        constant_time_eq(
            expected.as_bytes(),
            notification.signature_key.to_ascii_lowercase().as_bytes(),
        )
    }
}
