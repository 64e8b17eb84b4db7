// GNU Affero General Public License v3.0 or later (see LICENSE or https://www.gnu.org/licenses/agpl.txt)
//! GitHub access token acquisition

use std::error::Error;
use std::fmt;

/// Environment variable holding the GitHub personal access token
pub const TOKEN_ENV_VAR: &str = "GITHUB_PERSONAL_ACCESS_TOKEN";

/// A GitHub bearer token
///
/// `Debug` output is redacted so the token never ends up in verbose logs.
#[derive(Clone, PartialEq, Eq)]
pub struct Token(String);

impl Token {
    /// Wrap a raw token, rejecting blank input
    ///
    /// # Errors
    /// Returns error if the token is empty or whitespace only
    pub fn new(raw: impl Into<String>) -> Result<Self, Box<dyn Error>> {
        let raw = raw.into().trim().to_string();
        if raw.is_empty() {
            return Err("GitHub access token is empty".into());
        }
        Ok(Self(raw))
    }

    /// Raw token value for the Authorization header
    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Token(***)")
    }
}

/// Read the access token from the environment, or prompt for it
///
/// # Errors
/// Returns error if the prompt fails or the token is empty
pub fn read_token() -> Result<Token, Box<dyn Error>> {
    if let Ok(raw) = std::env::var(TOKEN_ENV_VAR)
        && !raw.trim().is_empty()
    {
        return Token::new(raw);
    }

    let raw = dialoguer::Password::new()
        .with_prompt("GitHub personal access token")
        .interact()
        .map_err(|e| format!("Failed to read access token: {e}"))?;
    eprintln!(
        "To avoid having to input your access token each run, consider setting the {TOKEN_ENV_VAR} environment variable"
    );
    Token::new(raw)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_token_is_rejected() {
        assert!(Token::new("   ").is_err());
    }

    #[test]
    fn debug_output_is_redacted() {
        let token = Token::new(" ghp_secret \n").unwrap();
        assert_eq!(token.expose(), "ghp_secret");
        assert_eq!(format!("{token:?}"), "Token(***)");
    }
}
