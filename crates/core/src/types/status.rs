//! Status enums shared across components.

use serde::{Deserialize, Serialize};

/// Visual kind of a user-facing notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum NoticeKind {
    Success,
    #[default]
    Info,
    Warning,
    Error,
}

/// Where a failure is shown to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Surface {
    /// Next to the offending form field; blocks the form.
    Inline,
    /// The "buy more credits" dialog; blocks the priced action.
    UpsellDialog,
    /// A dismissible toast; the operation is left in its pre-call state.
    Toast,
}

/// How a list of wizard items (products or collections) is filled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ItemSource {
    /// Entered by hand; no AI and no credits involved.
    #[default]
    Manual,
    /// Produced by a gated generation call.
    Generated,
}

impl std::fmt::Display for ItemSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Manual => write!(f, "manual"),
            Self::Generated => write!(f, "generated"),
        }
    }
}

impl std::str::FromStr for ItemSource {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "manual" => Ok(Self::Manual),
            "generated" => Ok(Self::Generated),
            _ => Err(format!("invalid item source: {s}")),
        }
    }
}
