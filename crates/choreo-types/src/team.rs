//! Team roster entries used for responder selection.

use serde::{Deserialize, Serialize};

/// A person who can be engaged on an incident.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamMember {
    pub id: String,
    pub name: String,
    pub email: String,
    /// Chat user handle (e.g. a workspace member id).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chat_handle: Option<String>,
    /// Code-host username.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code_handle: Option<String>,
    #[serde(default)]
    pub teams: Vec<String>,
    /// Skill keywords; compared exactly and treated as a set.
    #[serde(default)]
    pub skills: Vec<String>,
    #[serde(default)]
    pub on_call: bool,
}

impl TeamMember {
    pub fn new(id: impl Into<String>, name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            email: email.into(),
            chat_handle: None,
            code_handle: None,
            teams: Vec::new(),
            skills: Vec::new(),
            on_call: false,
        }
    }

    pub fn with_skills<I, S>(mut self, skills: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.skills = skills.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_teams<I, S>(mut self, teams: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.teams = teams.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_chat_handle(mut self, handle: impl Into<String>) -> Self {
        self.chat_handle = Some(handle.into());
        self
    }

    pub fn with_code_handle(mut self, handle: impl Into<String>) -> Self {
        self.code_handle = Some(handle.into());
        self
    }

    pub fn on_call(mut self, on_call: bool) -> Self {
        self.on_call = on_call;
        self
    }

    /// Whether any of this member's skills matches one of `keywords`.
    pub fn has_any_skill(&self, keywords: &[&str]) -> bool {
        self.skills
            .iter()
            .any(|skill| keywords.contains(&skill.as_str()))
    }
}
