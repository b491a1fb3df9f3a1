use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Ordered sequence of uppercase letters a phrase must match
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Acronym(String);

impl Acronym {
    /// Draw `len` letters from a weighted pool (weight = how often a letter repeats)
    pub fn generate<R: Rng + ?Sized>(pool: &str, len: usize, rng: &mut R) -> Self {
        let letters: Vec<char> = pool
            .chars()
            .filter(|c| c.is_ascii_alphabetic())
            .map(|c| c.to_ascii_uppercase())
            .collect();
        if letters.is_empty() {
            return Self(String::new());
        }
        Self(
            (0..len)
                .map(|_| letters[rng.random_range(0..letters.len())])
                .collect(),
        )
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.chars().count()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Whether the initials of `text` spell this acronym
    pub fn matches(&self, text: &str) -> bool {
        acronym_of(text) == self.0
    }
}

impl From<&str> for Acronym {
    fn from(letters: &str) -> Self {
        Self(letters.to_ascii_uppercase())
    }
}

impl fmt::Display for Acronym {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Uppercase, blank out anything but `[A-Z0-9'-]`, collapse whitespace
pub fn normalize_phrase(text: &str) -> String {
    let cleaned: String = text
        .to_uppercase()
        .chars()
        .map(|c| {
            if c.is_ascii_uppercase() || c.is_ascii_digit() || c == '\'' || c == '-' {
                c
            } else {
                ' '
            }
        })
        .collect();
    cleaned.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// First character of every word of the normalized phrase
pub fn acronym_of(text: &str) -> String {
    normalize_phrase(text)
        .split(' ')
        .filter_map(|word| word.chars().next())
        .collect()
}
