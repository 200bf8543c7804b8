//! Newtype wrappers for label-bound strings.
//!
//! All newtypes serialize/deserialize as plain strings.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Deref;

macro_rules! string_newtype {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Return the inner string as a slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Consume self and return the inner `String`.
            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl Deref for $name {
            type Target = str;
            fn deref(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl PartialEq<str> for $name {
            fn eq(&self, other: &str) -> bool {
                self.0 == other
            }
        }

        impl PartialEq<&str> for $name {
            fn eq(&self, other: &&str) -> bool {
                self.0 == *other
            }
        }
    };
}

string_newtype!(
    /// A Bazel rule name. Only constructed through [`bazel_label`] so it never
    /// contains `/`, `-` or `+`.
    Label
);

string_newtype!(
    /// A human-readable pod name such as `Foo/Core`. Never sanitized.
    ExternalName
);

/// Sanitize a manifest name into a Bazel label by replacing `/`, `-` and `+`
/// with `_`. Idempotent.
pub fn bazel_label(name: &str) -> Label {
    Label(
        name.chars()
            .map(|c| match c {
                '/' | '-' | '+' => '_',
                other => other,
            })
            .collect(),
    )
}

impl Label {
    /// `:<label>`, the same-package reference form.
    pub fn local_ref(&self) -> String {
        format!(":{}", self.0)
    }

    /// Append a suffix, sanitizing it first.
    #[must_use]
    pub fn suffixed(&self, suffix: &str) -> Label {
        bazel_label(&format!("{}_{suffix}", self.0))
    }
}

impl ExternalName {
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }
}
