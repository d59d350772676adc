//! Presentation helpers for admin screens and payment summaries.
//!
//! Every function here accepts any input and falls back to a generic label
//! for values it does not recognise.

use bigdecimal::BigDecimal;
use serde::Serialize;

use crate::domain::PaymentRecord;

const CURRENCY_PREFIX: &str = "Rp";

/// Formats an amount as Indonesian rupiah, e.g. `Rp 9.000.000` or
/// `Rp 1.250,50`. Cents are shown only when nonzero.
pub fn format_currency(amount: &BigDecimal) -> String {
    let text = amount.round(2).with_scale(2).to_string();
    let (negative, digits) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text.as_str()),
    };
    let (whole, fraction) = digits.split_once('.').unwrap_or((digits, "00"));

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, ch) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(ch);
    }
    if fraction.chars().any(|ch| ch != '0') {
        grouped.push(',');
        grouped.push_str(fraction);
    }

    let is_zero = !grouped.chars().any(|ch| ch.is_ascii_digit() && ch != '0');
    if negative && !is_zero {
        format!("-{} {}", CURRENCY_PREFIX, grouped)
    } else {
        format!("{} {}", CURRENCY_PREFIX, grouped)
    }
}

/// Label and badge class for a status badge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StatusLabel {
    pub label: &'static str,
    pub class: &'static str,
}

pub fn status_label(status: &str) -> StatusLabel {
    match status {
        "paid" => StatusLabel {
            label: "Lunas",
            class: "badge-success",
        },
        "unpaid" => StatusLabel {
            label: "Belum Lunas",
            class: "badge-warning",
        },
        _ => StatusLabel {
            label: "Tidak Diketahui",
            class: "badge-secondary",
        },
    }
}

pub fn payment_method_label(method: &str) -> &'static str {
    match method {
        "bank_transfer" => "Transfer Bank",
        "e_wallet" => "E-Wallet",
        "credit_card" => "Kartu Kredit",
        _ => "Lainnya",
    }
}

/// A payment with its display labels resolved.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentSummary {
    pub payment: PaymentRecord,
    pub total_formatted: String,
    pub status_label: &'static str,
    pub status_class: &'static str,
    pub method_label: &'static str,
}

impl PaymentSummary {
    pub fn from_record(payment: PaymentRecord) -> Self {
        let status = status_label(payment.status.as_str());
        Self {
            total_formatted: format_currency(&payment.total_amount),
            status_label: status.label,
            status_class: status.class,
            method_label: payment_method_label(payment.payment_method.as_str()),
            payment,
        }
    }
}
