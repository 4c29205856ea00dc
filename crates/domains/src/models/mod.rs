//! # Domain Models
//!
//! These structs represent the core entities of Questboard.
//! IDs are UUID v7 so they sort by creation time in every store.

use serde::{Deserialize, Serialize};

/// Declares a fieldless enum that round-trips through a snake_case string,
/// both in JSON (serde) and in text columns (`as_str` / `FromStr`).
macro_rules! text_enum {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident {
            $( $(#[$vmeta:meta])* $variant:ident => $text:literal ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
        $vis enum $name {
            $( $(#[$vmeta])* #[serde(rename = $text)] $variant ),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $( $name::$variant => $text ),+
                }
            }
        }

        impl std::str::FromStr for $name {
            type Err = crate::DomainError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $( $text => Ok($name::$variant), )+
                    other => Err(crate::DomainError::Validation(format!(
                        "unknown {} '{}'", stringify!($name), other
                    ))),
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

pub mod booking;
pub mod favorite;
pub mod game;
pub mod messaging;
pub mod notification;
pub mod review;
pub mod social;
pub mod user;

pub use booking::*;
pub use favorite::*;
pub use game::*;
pub use messaging::*;
pub use notification::*;
pub use review::*;
pub use social::*;
pub use user::*;

/// Limit/offset pagination shared by every list query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    pub limit: u32,
    pub offset: u32,
}

impl Page {
    pub const DEFAULT_LIMIT: u32 = 20;
    pub const MAX_LIMIT: u32 = 100;

    /// Builds a page from optional query values, clamping the limit to
    /// `1..=MAX_LIMIT`.
    pub fn new(limit: Option<u32>, offset: Option<u32>) -> Self {
        Self {
            limit: limit.unwrap_or(Self::DEFAULT_LIMIT).clamp(1, Self::MAX_LIMIT),
            offset: offset.unwrap_or(0),
        }
    }

    /// Applies the page to an already sorted iterator.
    pub fn apply<T>(&self, items: impl IntoIterator<Item = T>) -> Vec<T> {
        items
            .into_iter()
            .skip(self.offset as usize)
            .take(self.limit as usize)
            .collect()
    }
}

impl Default for Page {
    fn default() -> Self {
        Self::new(None, None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_clamps_limit() {
        assert_eq!(Page::new(Some(0), None).limit, 1);
        assert_eq!(Page::new(Some(5000), None).limit, Page::MAX_LIMIT);
        assert_eq!(Page::new(None, None).limit, Page::DEFAULT_LIMIT);
    }

    #[test]
    fn page_applies_offset_then_limit() {
        let page = Page::new(Some(2), Some(3));
        assert_eq!(page.apply(0..10), vec![3, 4]);
    }

    #[test]
    fn text_enums_round_trip_through_str() {
        for role in Role::ALL {
            assert_eq!(role.as_str().parse::<Role>().unwrap(), *role);
        }
        assert!("wizard".parse::<Role>().is_err());
        assert_eq!(serde_json::to_string(&Platform::InPerson).unwrap(), "\"in_person\"");
    }
}
