//! Non-empty string newtypes for revision payloads and script paths.

/// Define a string newtype that can never hold an empty value.
///
/// Deserialization goes through `TryFrom<String>`, so an empty string in a
/// state file is rejected instead of producing an unusable identifier.
macro_rules! define_newtype_string {
    (
        $(#[$meta:meta])*
        $vis:vis struct $Name:ident;
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
        #[serde(try_from = "String", into = "String")]
        $vis struct $Name(String);

        impl $Name {
            /// Wrap `value`.
            ///
            /// # Panics
            /// When `value` is empty; use `TryFrom` for untrusted input.
            pub fn new(value: impl Into<String>) -> Self {
                match Self::try_from(value.into()) {
                    Ok(v) => v,
                    Err(e) => panic!("{}", e),
                }
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl TryFrom<String> for $Name {
            type Error = String;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                if value.is_empty() {
                    Err(concat!(stringify!($Name), " must not be empty").to_string())
                } else {
                    Ok(Self(value))
                }
            }
        }

        impl From<$Name> for String {
            fn from(value: $Name) -> String {
                value.0
            }
        }

        impl std::fmt::Display for $Name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl std::ops::Deref for $Name {
            type Target = str;
            fn deref(&self) -> &str {
                &self.0
            }
        }

        impl AsRef<str> for $Name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl PartialEq<str> for $Name {
            fn eq(&self, other: &str) -> bool {
                self.0 == other
            }
        }

        impl PartialEq<&str> for $Name {
            fn eq(&self, other: &&str) -> bool {
                self.0 == *other
            }
        }
    };
}

pub(crate) use define_newtype_string;
