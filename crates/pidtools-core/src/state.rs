//! # DOI States and State Events
//!
//! ```text
//! draft ──register──▶ registered ──publish──▶ findable
//!   │                     ▲                      │
//!   │                     └─────────hide─────────┘
//!   └──delete──▶ (record removed)
//! ```
//!
//! The registration service is authoritative for `state`. The workspace
//! submits the event name and records whatever state the service reports;
//! [`DoiState::expected_after`] exists for test doubles and diagnostics and
//! is never used to refuse a request.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Remote lifecycle state of a DOI record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DoiState {
    /// Created but not registered with the resolver. Deletable.
    Draft,
    /// Registered and resolvable, but hidden from search.
    Registered,
    /// Registered and discoverable.
    Findable,
}

impl DoiState {
    /// The wire name of the state.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Registered => "registered",
            Self::Findable => "findable",
        }
    }

    /// The state the registration service moves a record to when `event`
    /// is applied in this state, or `None` when the service rejects it.
    pub fn expected_after(&self, event: StateEvent) -> Option<DoiState> {
        match (self, event) {
            (Self::Draft, StateEvent::Register) => Some(Self::Registered),
            (Self::Registered, StateEvent::Publish) => Some(Self::Findable),
            (Self::Findable, StateEvent::Hide) => Some(Self::Registered),
            _ => None,
        }
    }

    /// Whether the service accepts a delete in this state.
    pub fn is_deletable(&self) -> bool {
        matches!(self, Self::Draft)
    }

    /// Operator actions worth offering for a record in this state.
    pub fn available_actions(&self) -> Vec<DoiAction> {
        match self {
            Self::Draft => vec![
                DoiAction::Update,
                DoiAction::Transition(StateEvent::Register),
                DoiAction::Delete,
            ],
            Self::Registered => vec![
                DoiAction::Update,
                DoiAction::Transition(StateEvent::Publish),
            ],
            Self::Findable => vec![DoiAction::Update, DoiAction::Transition(StateEvent::Hide)],
        }
    }
}

impl fmt::Display for DoiState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DoiState {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "draft" => Ok(Self::Draft),
            "registered" => Ok(Self::Registered),
            "findable" => Ok(Self::Findable),
            other => Err(CoreError::UnknownState(other.to_string())),
        }
    }
}

/// A state-transition event understood by the registration service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StateEvent {
    /// draft → registered. Irreversible: registered DOIs cannot be deleted.
    Register,
    /// registered → findable.
    Publish,
    /// findable → registered.
    Hide,
}

impl StateEvent {
    /// The wire name of the event.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Register => "register",
            Self::Publish => "publish",
            Self::Hide => "hide",
        }
    }
}

impl fmt::Display for StateEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StateEvent {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "register" => Ok(Self::Register),
            "publish" => Ok(Self::Publish),
            "hide" => Ok(Self::Hide),
            other => Err(CoreError::UnknownEvent(other.to_string())),
        }
    }
}

/// An action an operator may take on an existing DOI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DoiAction {
    /// Resend the full candidate metadata.
    Update,
    /// Submit a state event.
    Transition(StateEvent),
    /// Remove the record (draft only).
    Delete,
}
