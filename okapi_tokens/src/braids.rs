use aliri_braid::braid;
use std::fmt;

macro_rules! limited_reveal {
    ($ty:ty: $hidden:literal, $default:literal) => {
        impl fmt::Debug for $ty {
            fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
                if f.alternate() {
                    f.write_str("\"")?;
                    limited_reveal(&self.0, &mut *f, $default)?;
                    f.write_str("\"")
                } else {
                    f.write_str(concat!("***", $hidden, "***"))
                }
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
                if f.alternate() {
                    limited_reveal(&self.0, &mut *f, usize::MAX)
                } else {
                    f.write_str(concat!("***", $hidden, "***"))
                }
            }
        }
    };
}

fn limited_reveal(unprotected: &str, f: &mut fmt::Formatter, default_len: usize) -> fmt::Result {
    let max_len = f.width().unwrap_or(default_len);
    if max_len <= 1 {
        f.write_str("…")
    } else if max_len > unprotected.len() {
        f.write_str(unprotected)
    } else {
        match unprotected.char_indices().nth(max_len - 2) {
            Some((idx, c)) if idx + c.len_utf8() < unprotected.len() => {
                f.write_str(&unprotected[0..idx + c.len_utf8()])?;
                f.write_str("…")
            }
            _ => f.write_str(unprotected),
        }
    }
}

/// The tenant a connection acts on behalf of
///
/// Sent as `X-Okapi-Tenant` on every request, including the login.
#[braid(serde)]
pub struct Tenant;

/// The name a user logs in with
#[braid(serde)]
pub struct Username;

/// The identifier of a user, usable in place of a username when logging in
#[braid(serde)]
pub struct UserId;

/// An access token issued by the Okapi login endpoint
///
/// Sent as `X-Okapi-Token` on authenticated requests. Formatting hides the
/// value unless the alternate flag is used, and even then only a prefix is
/// revealed by `Debug`.
#[braid(serde, debug = "owned", display = "owned")]
pub struct AccessToken;

limited_reveal!(AccessTokenRef: "ACCESS TOKEN", 15);

impl AccessTokenRef {
    /// Whether the token carries no characters at all
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn access_token_is_hidden_by_default() {
        let token = AccessToken::from_static("eyJhbGciOiJIUzI1NiJ9.payload.signature");
        assert_eq!(format!("{:?}", token), "***ACCESS TOKEN***");
        assert_eq!(format!("{}", token), "***ACCESS TOKEN***");
    }

    #[test]
    fn access_token_reveals_prefix_when_asked() {
        let token = AccessToken::from_static("eyJhbGciOiJIUzI1NiJ9.payload.signature");
        assert_eq!(format!("{:#?}", token), "\"eyJhbGciOiJIUz…\"");
        assert_eq!(format!("{:#5?}", token), "\"eyJh…\"");
    }

    #[test]
    fn short_access_token_is_revealed_whole_when_asked() {
        let token = AccessToken::from_static("abc");
        assert_eq!(format!("{:#?}", token), "\"abc\"");
        assert_eq!(format!("{:#}", token), "abc");
    }
}
