//! Anti-CSRF `state` parameter for the authorization request.
//!
//! The state is the caller's post-login destination, base64 encoded. It carries no
//! nonce of its own: forgery protection comes from the state also being stored in a
//! same-site cookie and compared byte-for-byte on the callback.

use base64::{engine::general_purpose::STANDARD, Engine};
use log::*;

/// Destination used when the caller gives none or the state decodes to nothing.
pub const DEFAULT_RETURN_PATH: &str = "/";

/// Encode a return path into the opaque `state` value sent to the identity provider.
pub fn encode_return_path(return_path: &str) -> String {
    STANDARD.encode(return_path.as_bytes())
}

/// Recover the post-login destination from a consumed `state` value.
///
/// An empty decode yields `/`, and a path without a leading slash gets one.
/// Protocol-relative results (`//host`, `/\host`) would leave this site, so they also yield `/`.
pub fn destination_from_state(state: &str) -> String {
    let decoded = match STANDARD.decode(state.as_bytes()) {
        Ok(bytes) => match String::from_utf8(bytes) {
            Ok(path) => path,
            Err(e) => {
                warn!("Login state is not valid UTF-8, using default destination: {e}");
                return DEFAULT_RETURN_PATH.to_string();
            }
        },
        Err(e) => {
            warn!("Login state is not valid base64, using default destination: {e}");
            return DEFAULT_RETURN_PATH.to_string();
        }
    };

    normalize_return_path(&decoded)
}

/// Normalize a return path into a same-site absolute path.
pub fn normalize_return_path(path: &str) -> String {
    if path.is_empty() {
        return DEFAULT_RETURN_PATH.to_string();
    }

    let path = if path.starts_with('/') {
        path.to_string()
    } else {
        format!("/{path}")
    };

    if path.starts_with("//") || path.starts_with("/\\") {
        warn!("Rejecting off-site login destination {path:?}");
        return DEFAULT_RETURN_PATH.to_string();
    }

    path
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_is_standard_base64() {
        assert_eq!(encode_return_path("/dashboard"), "L2Rhc2hib2FyZA==");
        assert_eq!(encode_return_path("/"), "Lw==");
        assert_eq!(encode_return_path(""), "");
    }

    #[test]
    fn test_round_trip_normalizes_paths() {
        for (path, expected) in [
            ("/", "/"),
            ("/dashboard", "/dashboard"),
            ("dashboard", "/dashboard"),
            ("", "/"),
            ("/reports?year=2024#q1", "/reports?year=2024#q1"),
        ] {
            assert_eq!(
                destination_from_state(&encode_return_path(path)),
                expected,
                "path {path:?}"
            );
        }
    }

    #[test]
    fn test_protocol_relative_destination_falls_back_to_root() {
        assert_eq!(destination_from_state(&encode_return_path("//evil.example")), "/");
        assert_eq!(destination_from_state(&encode_return_path("/\\evil.example")), "/");
    }

    #[test]
    fn test_absolute_url_becomes_a_local_path() {
        assert_eq!(
            destination_from_state(&encode_return_path("https://evil.example")),
            "/https://evil.example"
        );
    }

    #[test]
    fn test_undecodable_state_falls_back_to_root() {
        assert_eq!(destination_from_state("not base64!"), "/");
        assert_eq!(destination_from_state(&STANDARD.encode([0xff, 0xfe])), "/");
    }
}
