//! Payment methods and QR content
//!
//! The method set is closed (cash, momo, zalopay, vietqr) but unknown
//! codes from the callback are accepted and displayed as-is. QR content
//! points the customer's phone at the local confirmation page.

pub mod server;

use std::net::UdpSocket;
use tracing::debug;

/// Method code assumed when the callback carries no `m` query parameter
pub const DEFAULT_CALLBACK_METHOD: &str = "vietqr";

/// QR content used when no confirmation page URL is available
pub const QR_FALLBACK_TEXT: &str = "THANHTOANTHANHCON";

/// How the customer pays
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentMethod {
    Cash,
    Momo,
    ZaloPay,
    VietQr,
    /// Unrecognized code passed through from the callback
    Other(String),
}

impl PaymentMethod {
    /// Parse a method code; unknown codes pass through untouched.
    pub fn from_code(code: &str) -> Self {
        match code {
            "cash" => PaymentMethod::Cash,
            "momo" => PaymentMethod::Momo,
            "zalopay" => PaymentMethod::ZaloPay,
            "vietqr" => PaymentMethod::VietQr,
            other => PaymentMethod::Other(other.to_string()),
        }
    }

    /// Wire code used in callback URLs
    pub fn code(&self) -> &str {
        match self {
            PaymentMethod::Cash => "cash",
            PaymentMethod::Momo => "momo",
            PaymentMethod::ZaloPay => "zalopay",
            PaymentMethod::VietQr => "vietqr",
            PaymentMethod::Other(code) => code,
        }
    }

    /// Customer-facing name printed on the invoice
    pub fn display_name(&self) -> &str {
        match self {
            PaymentMethod::Cash => "Tiền mặt",
            PaymentMethod::Momo => "Momo",
            PaymentMethod::ZaloPay => "ZaloPay",
            PaymentMethod::VietQr => "VietQR",
            PaymentMethod::Other(code) => code,
        }
    }
}

/// Build the QR content for the confirmation page, or the fixed fallback
/// text when no listener is running.
pub fn qr_content(page_url: Option<&str>, method: &PaymentMethod) -> String {
    match page_url {
        Some(url) => format!("{}?m={}", url, method.code()),
        None => QR_FALLBACK_TEXT.to_string(),
    }
}

/// Best-effort LAN address for the confirmation URL. Connecting a UDP
/// socket sends no packets; it only selects the outbound interface.
pub fn local_ip() -> String {
    match probe_local_ip() {
        Some(ip) => ip,
        None => {
            debug!("LAN address probe failed, falling back to loopback");
            "127.0.0.1".to_string()
        }
    }
}

fn probe_local_ip() -> Option<String> {
    let socket = UdpSocket::bind("0.0.0.0:0").ok()?;
    socket.connect("8.8.8.8:80").ok()?;
    Some(socket.local_addr().ok()?.ip().to_string())
}
