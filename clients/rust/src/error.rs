use alidisk_sdk::DriveError;

/// Maps an HTTP status plus the provider's error `code` to a [`DriveError`].
pub(crate) fn from_response(status: u16, code: &str, message: String) -> DriveError {
    let msg = if message.trim().is_empty() {
        code.to_string()
    } else {
        message.trim().to_string()
    };

    if code.starts_with("QuotaExhausted") {
        return DriveError::QuotaExceeded(msg);
    }
    if code.starts_with("AlreadyExist") {
        return DriveError::AlreadyExists(msg);
    }
    if code.starts_with("NotFound") {
        return DriveError::NotFound(msg);
    }

    match status {
        401 => DriveError::Unauthorized(msg),
        403 => DriveError::PermissionDenied(msg),
        404 => DriveError::NotFound(msg),
        409 => DriveError::AlreadyExists(msg),
        400 => DriveError::InvalidArgument(msg),
        429 | 502 | 503 => DriveError::Transient(msg),
        504 => DriveError::Timeout,
        _ => DriveError::Request {
            status,
            message: msg,
        },
    }
}

pub(crate) fn from_reqwest(err: &reqwest::Error) -> DriveError {
    if err.is_timeout() {
        DriveError::Timeout
    } else if err.is_decode() {
        DriveError::Serialization(err.to_string())
    } else {
        DriveError::Connection(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_codes_win_over_status() {
        assert!(matches!(
            from_response(400, "QuotaExhausted.Drive", "drive is full".into()),
            DriveError::QuotaExceeded(_)
        ));
        assert!(matches!(
            from_response(400, "AlreadyExist.File", String::new()),
            DriveError::AlreadyExists(m) if m == "AlreadyExist.File"
        ));
        assert!(matches!(
            from_response(400, "NotFound.FileId", "gone".into()),
            DriveError::NotFound(_)
        ));
    }

    #[test]
    fn status_fallbacks() {
        assert!(matches!(
            from_response(401, "AccessTokenInvalid", "expired".into()),
            DriveError::Unauthorized(_)
        ));
        assert!(from_response(429, "TooManyRequests", String::new()).is_transient());
        assert!(matches!(from_response(504, "", String::new()), DriveError::Timeout));
        assert!(matches!(
            from_response(418, "Teapot", "short and stout".into()),
            DriveError::Request { status: 418, .. }
        ));
    }
}
