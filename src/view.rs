//! View state for presentation layers
//!
//! A session is plain data: the caller hands it in together with an
//! [`Action`] and gets the next session back. Nothing here is global.

use serde::{Deserialize, Serialize};

use crate::auth::CredentialCheck;

/// What the user is currently looking at
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "view", rename_all = "snake_case")]
pub enum View {
    #[default]
    Home,
    Section {
        id: i64,
    },
    Search {
        query: String,
    },
    EditSection {
        id: i64,
    },
    EditQuestion {
        section_id: i64,
        question_id: i64,
    },
}

/// User intents that move between views
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Action {
    Home,
    OpenSection { id: i64 },
    Search { query: String },
    ClearSearch,
    Back,
    EditSection { id: i64 },
    EditQuestion { section_id: i64, question_id: i64 },
    Cancel,
    /// The record being edited was saved
    Saved,
    /// The record being edited was deleted
    Deleted,
    Login { secret: String },
    Logout,
}

/// Per-user presentation state
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Session {
    #[serde(default)]
    pub view: View,
    #[serde(default)]
    pub admin: bool,
}

impl View {
    pub fn is_editing(&self) -> bool {
        matches!(self, View::EditSection { .. } | View::EditQuestion { .. })
    }

    /// Where an edit view returns to once it is left
    fn leave_edit(self) -> View {
        match self {
            View::EditSection { id } => View::Section { id },
            View::EditQuestion { section_id, .. } => View::Section { id: section_id },
            other => other,
        }
    }
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply one action and return the resulting session
    pub fn apply(self, action: Action, gate: &dyn CredentialCheck) -> Session {
        let Session { view, admin } = self;

        match action {
            Action::Home => Session { view: View::Home, admin },
            Action::OpenSection { id } => Session { view: View::Section { id }, admin },
            Action::Search { query } => {
                let query = query.trim();
                if query.is_empty() {
                    Session { view, admin }
                } else {
                    let query = query.to_string();
                    Session { view: View::Search { query }, admin }
                }
            }
            Action::ClearSearch => match view {
                View::Search { .. } => Session { view: View::Home, admin },
                view => Session { view, admin },
            },
            Action::Back => {
                let view = match view {
                    View::Section { .. } | View::Search { .. } | View::Home => View::Home,
                    editing => editing.leave_edit(),
                };
                Session { view, admin }
            }
            Action::EditSection { id } if admin => Session { view: View::EditSection { id }, admin },
            Action::EditQuestion { section_id, question_id } if admin => Session {
                view: View::EditQuestion { section_id, question_id },
                admin,
            },
            Action::EditSection { .. } | Action::EditQuestion { .. } => {
                tracing::debug!("Edit requested without admin session");
                Session { view, admin }
            }
            Action::Cancel | Action::Saved => Session { view: view.leave_edit(), admin },
            Action::Deleted => {
                let view = match view {
                    View::EditSection { .. } => View::Home,
                    other => other.leave_edit(),
                };
                Session { view, admin }
            }
            Action::Login { secret } => {
                let granted = gate.verify(&secret);
                if !granted {
                    tracing::warn!("Admin login rejected");
                }
                Session { view, admin: granted }
            }
            Action::Logout => Session { view: view.leave_edit(), admin: false },
        }
    }
}
