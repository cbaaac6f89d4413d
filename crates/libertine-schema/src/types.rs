//! Newtype wrappers for container and package identifiers.
//!
//! Both newtypes serialize/deserialize as plain strings, matching the raw
//! values stored in `ContainersConfig.json`. Validation is separate from
//! construction: identifiers read from the registry are taken as-is, and
//! [`validate_container_id`] / [`validate_package_name`] gate any value that
//! ends up on an external tool's command line.

use crate::SchemaError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Deref;

macro_rules! id_newtype {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Wrap a raw string without validating it.
            pub fn new(s: impl Into<String>) -> Self {
                Self(s.into())
            }

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

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_owned())
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }
    };
}

id_newtype!(
    /// Opaque container identifier, the correlation key for every operation.
    ContainerId
);

id_newtype!(
    /// Debian package name targeted by install/remove/search operations.
    PackageName
);

/// Check that a container id is safe to pass as a subprocess argument.
///
/// Anything outside `[A-Za-z0-9_.-]` is rejected so that ids can never smuggle
/// shell metacharacters or option-looking prefixes into the external tool.
pub fn validate_container_id(id: &str) -> Result<(), SchemaError> {
    if id.is_empty() || id.starts_with('-') {
        return Err(SchemaError::InvalidContainerId(id.to_owned()));
    }
    if !id
        .bytes()
        .all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'.' || b == b'-')
    {
        return Err(SchemaError::InvalidContainerId(id.to_owned()));
    }
    Ok(())
}

/// Check that a package name is safe to pass as a subprocess argument.
///
/// Debian package names additionally allow `+` and a `:arch` qualifier
/// (e.g. `libc6:i386`), so the accepted set is slightly wider than for ids.
pub fn validate_package_name(name: &str) -> Result<(), SchemaError> {
    if name.is_empty() || name.starts_with('-') {
        return Err(SchemaError::InvalidPackageName(name.to_owned()));
    }
    if !name
        .bytes()
        .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'_' | b'.' | b'+' | b':' | b'-'))
    {
        return Err(SchemaError::InvalidPackageName(name.to_owned()));
    }
    Ok(())
}
