//! UI primitives shared across the crate.

/// How the gallery pulls in further pages.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ScrollMode {
    /// Load the next page when the sentinel scrolls into view.
    #[default]
    Auto,
    /// Load the next page only from the "load more" button.
    Manual,
}

impl ScrollMode {
    /// All modes in toggle order.
    #[must_use]
    pub const fn all() -> [Self; 2] {
        [Self::Auto, Self::Manual]
    }

    /// Stored representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Auto => "auto",
            Self::Manual => "manual",
        }
    }

    /// Parse a stored value.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim() {
            "auto" => Some(Self::Auto),
            "manual" => Some(Self::Manual),
            _ => None,
        }
    }
}
