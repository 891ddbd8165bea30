use serde::Serialize;
use std::fmt;

/// An ordered command line, one entry per token.
///
/// Tokens are kept exactly as pushed and joined with single spaces when
/// rendered. No quoting or escaping is applied; callers that hand the joined
/// text to a shell are responsible for that. Blank tokens are never stored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct CommandTokens(Vec<String>);

impl CommandTokens {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `token` unless it is empty or whitespace-only.
    pub fn push(&mut self, token: impl Into<String>) {
        let token = token.into();
        if !token.trim().is_empty() {
            self.0.push(token);
        }
    }

    pub fn extend<I, T>(&mut self, tokens: I)
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        for token in tokens {
            self.push(token);
        }
    }

    pub fn append(&mut self, other: CommandTokens) {
        self.0.extend(other.0);
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, String> {
        self.0.iter()
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    pub fn into_vec(self) -> Vec<String> {
        self.0
    }

    pub fn join(&self) -> String {
        self.0.join(" ")
    }
}

impl fmt::Display for CommandTokens {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.join())
    }
}

impl<T: Into<String>> FromIterator<T> for CommandTokens {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut tokens = CommandTokens::new();
        tokens.extend(iter);
        tokens
    }
}

impl<'a> IntoIterator for &'a CommandTokens {
    type Item = &'a String;
    type IntoIter = std::slice::Iter<'a, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl IntoIterator for CommandTokens {
    type Item = String;
    type IntoIter = std::vec::IntoIter<String>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl PartialEq<[&str]> for CommandTokens {
    fn eq(&self, other: &[&str]) -> bool {
        self.0.len() == other.len() && self.0.iter().zip(other).all(|(a, b)| a == b)
    }
}

impl<const N: usize> PartialEq<[&str; N]> for CommandTokens {
    fn eq(&self, other: &[&str; N]) -> bool {
        self == &other[..]
    }
}
