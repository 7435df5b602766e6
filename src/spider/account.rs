use serde::Serialize;

/// Public profile fields of a GitHub account
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AccountProfile {
    pub login: String,
    pub name: Option<String>,
    pub avatar_url: String,
    pub followers: u64,
    pub following: u64,
    pub public_repos: u64,
    pub company: Option<String>,
    pub location: Option<String>,
    pub bio: Option<String>,
}

/// An account admitted into the graph, with the crawl level at which it was admitted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccountNode {
    #[serde(flatten)]
    pub profile: AccountProfile,
    pub depth: usize,
}

impl AccountNode {
    #[must_use]
    pub const fn new(profile: AccountProfile, depth: usize) -> Self {
        Self { profile, depth }
    }

    #[must_use]
    pub fn login(&self) -> &str {
        &self.profile.login
    }

    /// Display label: `Name (login)` when a display name is known, else the login.
    #[must_use]
    pub fn label(&self) -> String {
        match self.profile.name.as_deref().map(str::trim) {
            Some(name) if !name.is_empty() => format!("{name} ({})", self.profile.login),
            _ => self.profile.login.clone(),
        }
    }
}
