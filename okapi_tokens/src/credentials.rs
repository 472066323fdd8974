//! Short-lived credentials used for a single login exchange

use std::fmt;

use zeroize::Zeroize;

use crate::{UserId, UserIdRef, Username, UsernameRef};

/// A username and/or user ID together with a password
///
/// Values of this type are meant to live only as long as one login
/// exchange. The password is held in an owned buffer which is overwritten
/// in place by [`erase()`][Self::erase()]; the same happens when the value
/// is dropped, so the password does not outlive the credentials on any
/// exit path.
///
/// The password is never shown by `Debug`.
pub struct Credentials {
    username: Option<Username>,
    user_id: Option<UserId>,
    password: String,
    erased: bool,
}

impl Credentials {
    /// Constructs a new set of credentials
    ///
    /// At least one of `username` and `user_id` should be non-blank for the
    /// credentials to be usable for a login. This is checked when the
    /// credentials are used, not here.
    pub fn new(username: Option<Username>, user_id: Option<UserId>, password: String) -> Self {
        Self {
            username,
            user_id,
            password,
            erased: false,
        }
    }

    /// Constructs credentials that identify the user by name
    pub fn with_username(username: impl Into<Username>, password: String) -> Self {
        Self::new(Some(username.into()), None, password)
    }

    /// Constructs credentials that identify the user by ID
    pub fn with_user_id(user_id: impl Into<UserId>, password: String) -> Self {
        Self::new(None, Some(user_id.into()), password)
    }

    /// The username, if any
    #[inline]
    pub fn username(&self) -> Option<&UsernameRef> {
        self.username.as_deref()
    }

    /// The user ID, if any
    #[inline]
    pub fn user_id(&self) -> Option<&UserIdRef> {
        self.user_id.as_deref()
    }

    /// Grants access to the password
    ///
    /// The returned slice must not be copied into longer-lived storage.
    /// After [`erase()`][Self::erase()] this is empty.
    #[inline]
    pub fn expose_password(&self) -> &str {
        &self.password
    }

    /// Overwrites the password buffer and empties it
    ///
    /// Erasing more than once has no further effect.
    pub fn erase(&mut self) {
        if !self.erased {
            self.password.zeroize();
            self.erased = true;
            tracing::trace!("credentials erased");
        }
    }

    /// Whether the password has been erased
    #[inline]
    pub fn is_erased(&self) -> bool {
        self.erased
    }
}

impl Drop for Credentials {
    fn drop(&mut self) {
        self.erase();
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("user_id", &self.user_id)
            .field("password", &"***PASSWORD***")
            .field("erased", &self.erased)
            .finish()
    }
}
