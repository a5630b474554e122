//! Shared-secret password gate

/// Accepted site passwords; an empty list disables the check
#[derive(Debug, Clone, Default)]
pub struct PasswordList {
    accepted: Vec<String>,
}

impl PasswordList {
    /// Parse a comma-separated list (`SITE_PASSWORD`)
    pub fn parse(raw: &str) -> Self {
        let accepted = raw
            .split(',')
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(str::to_string)
            .collect();
        Self { accepted }
    }

    /// Whether a password is required at all
    pub fn is_enabled(&self) -> bool {
        !self.accepted.is_empty()
    }

    /// Check a submitted password
    pub fn accepts(&self, candidate: Option<&str>) -> bool {
        if !self.is_enabled() {
            return true;
        }
        match candidate {
            Some(pass) => self.accepted.iter().any(|p| p == pass),
            None => false,
        }
    }
}
