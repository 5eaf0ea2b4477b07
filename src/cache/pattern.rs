//! Wildcard key patterns.
//!
//! `*` matches any run of characters (including none); every other character matches
//! itself. A pattern must match the whole key.

use regex::Regex;

#[derive(Debug, Clone)]
pub struct KeyPattern {
    regex: Regex,
}

impl KeyPattern {
    pub fn compile(pattern: &str) -> Result<Self, regex::Error> {
        let body = pattern
            .split('*')
            .map(regex::escape)
            .collect::<Vec<_>>()
            .join(".*");
        let regex = Regex::new(&format!("^{body}$"))?;
        Ok(Self { regex })
    }

    pub fn matches(&self, key: &str) -> bool {
        self.regex.is_match(key)
    }
}
