//! Default `User-Agent` value.

/// Product token sent before the version.
pub const CLIENT_NAME: &str = env!("CARGO_PKG_NAME");
/// Crate version sent after the product token.
pub const CLIENT_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Returns `name/version (os; arch)`, e.g. `oauth1-request-client/0.1.0 (linux; x86_64)`.
pub fn default_user_agent() -> String {
	format!(
		"{CLIENT_NAME}/{CLIENT_VERSION} ({}; {})",
		std::env::consts::OS,
		std::env::consts::ARCH
	)
}
