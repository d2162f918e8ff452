use std::time::Duration;

/// Application-level constants
pub const APP_NAME: &str = "Labdesk";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Domain appended to derived patient emails (display data, never a real
/// contact channel).
pub const EMAIL_DOMAIN: &str = "email.com";

/// Placeholder shown when a patient name yields an empty derived address.
pub const FALLBACK_EMAIL: &str = "paciente@email.com";

/// Sentinel stored in `sex` until the registration form grows the field.
pub const SEX_PENDING: &str = "N/A";

/// How long success/info toasts stay on screen.
pub const TOAST_DEFAULT_DURATION: Duration = Duration::from_secs(3);

/// Error toasts linger longer so the message can be read and reported.
pub const TOAST_ERROR_DURATION: Duration = Duration::from_secs(10);

/// Default tracing filter when RUST_LOG is not set.
pub fn default_log_filter() -> String {
    format!("info,{}=debug", env!("CARGO_PKG_NAME"))
}
