use serde_json::Value;

/// Masks credentials and payer instrument details in JSON payloads before
/// they are logged.
pub fn sanitize_json(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut sanitized = serde_json::Map::new();
            for (key, val) in map {
                let sanitized_val = if is_sensitive_field(key) {
                    mask_value(val)
                } else {
                    sanitize_json(val)
                };
                sanitized.insert(key.clone(), sanitized_val);
            }
            Value::Object(sanitized)
        }
        Value::Array(arr) => Value::Array(arr.iter().map(sanitize_json).collect()),
        _ => value.clone(),
    }
}

fn is_sensitive_field(key: &str) -> bool {
    matches!(
        key.to_ascii_lowercase().as_str(),
        "signature_key"
            | "signaturekey"
            | "server_key"
            | "password"
            | "token"
            | "api_key"
            | "authorization"
            | "va_number"
            | "vanumber"
            | "bill_key"
            | "billkey"
            | "card_number"
    )
}

fn mask_value(value: &Value) -> Value {
    match value {
        Value::String(s) if s.chars().count() > 8 => {
            let chars: Vec<char> = s.chars().collect();
            let start: String = chars[..4].iter().collect();
            let end: String = chars[chars.len() - 4..].iter().collect();
            Value::String(format!("{}****{}", start, end))
        }
        _ => Value::String("****".to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn masks_notification_signature() {
        let input = json!({
            "order_id": "PAY-2024-001",
            "signature_key": "4f1c0e9ad6b27f53a8e1c2d3b4a5968778695a4b3c2d1e0f",
            "gross_amount": "9000000.00"
        });

        let sanitized = sanitize_json(&input);
        let signature = sanitized["signature_key"].as_str().unwrap();

        assert_eq!(signature, "4f1c****1e0f");
        assert_eq!(sanitized["order_id"], "PAY-2024-001");
        assert_eq!(sanitized["gross_amount"], "9000000.00");
    }

    #[test]
    fn masks_nested_and_short_values() {
        let input = json!({
            "va_numbers": [{ "bank": "bca", "va_number": "12345" }],
            "gateway": { "billKey": "778899001122" }
        });

        let sanitized = sanitize_json(&input);
        assert_eq!(sanitized["va_numbers"][0]["va_number"], "****");
        assert_eq!(sanitized["va_numbers"][0]["bank"], "bca");
        assert_eq!(sanitized["gateway"]["billKey"], "7788****1122");
    }
}
