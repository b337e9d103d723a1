use std::fmt;

use xphub_client::ConnectionState;

/// Title line with the signed-in identity and push-channel status.
pub struct Navbar<'a> {
    pub username: Option<&'a str>,
    pub connection: Option<&'a ConnectionState>,
}

impl fmt::Display for Navbar<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "🤖 xphub")?;
        match self.username {
            Some(name) => write!(f, " · {name}")?,
            None => write!(f, " · not signed in")?,
        }
        if let Some(state) = self.connection {
            let live = match state {
                ConnectionState::Connected => "● live".to_string(),
                ConnectionState::Connecting => "◌ connecting".to_string(),
                ConnectionState::Reconnecting { attempt } => format!("◌ reconnecting ({attempt})"),
                ConnectionState::Disconnected => "○ offline".to_string(),
                ConnectionState::Failed { reason } => format!("✖ {reason}"),
            };
            write!(f, " · {live}")?;
        }
        writeln!(f)?;
        writeln!(f, "{}", "─".repeat(60))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shows_identity_and_link_state() {
        let text = Navbar {
            username: Some("TestUser"),
            connection: Some(&ConnectionState::Reconnecting { attempt: 2 }),
        }
        .to_string();
        assert!(text.starts_with("🤖 xphub · TestUser · ◌ reconnecting (2)"));

        let text = Navbar {
            username: None,
            connection: None,
        }
        .to_string();
        assert!(text.contains("not signed in"));
    }
}
