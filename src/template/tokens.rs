//! Placeholder token configuration.
//!
//! A [`TokenSet`] is an explicit configuration value passed into the engine
//! at call time: a literal delimiter pair plus an enumerable token-name →
//! field-name mapping. Nothing here is global or mutable after construction;
//! validation happens up front so an ambiguous set is rejected before any
//! generation run touches a package.

use crate::error::{Result, TemplateError};

/// Field names recognized by the standard token set.
pub const STANDARD_FIELDS: &[&str] = &["NAME", "BIRTH_DATE", "TITLE", "ROLE", "COMPANY", "EMAIL"];

/// One placeholder token: a name appearing between the delimiters, mapped to
/// the record field whose value replaces it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaceholderToken {
    /// The name appearing between the delimiters (e.g. "NAME")
    name: String,

    /// The record field this token resolves against
    field: String,
}

impl PlaceholderToken {
    /// The name appearing between the delimiters.
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The record field this token resolves against.
    #[inline]
    pub fn field(&self) -> &str {
        &self.field
    }
}

/// The set of placeholder tokens a generation run recognizes.
#[derive(Debug, Clone)]
pub struct TokenSet {
    /// Opening delimiter literal (default "{{")
    open: String,

    /// Closing delimiter literal (default "}}")
    close: String,

    /// Recognized tokens, in declaration order
    tokens: Vec<PlaceholderToken>,
}

impl TokenSet {
    /// The standard token set: `{{` / `}}` delimiters around the six
    /// standard fields, each token name mapping to the field of the same
    /// name.
    pub fn standard() -> Self {
        Self {
            open: "{{".to_string(),
            close: "}}".to_string(),
            tokens: STANDARD_FIELDS
                .iter()
                .map(|f| PlaceholderToken {
                    name: (*f).to_string(),
                    field: (*f).to_string(),
                })
                .collect(),
        }
    }

    /// Build a token set from explicit delimiters and (name, field) pairs.
    ///
    /// Fails with `AmbiguousTokenSet` when the configuration could make two
    /// tokens match the same text: empty delimiters, empty or duplicate
    /// names, or a name containing a delimiter character.
    pub fn new<S: Into<String>>(
        open: S,
        close: S,
        entries: impl IntoIterator<Item = (String, String)>,
    ) -> Result<Self> {
        let set = Self {
            open: open.into(),
            close: close.into(),
            tokens: entries
                .into_iter()
                .map(|(name, field)| PlaceholderToken { name, field })
                .collect(),
        };
        set.validate()?;
        Ok(set)
    }

    /// Extend this set with additional (name, field) pairs, re-validating.
    ///
    /// Used for template-specific aliases, e.g. mapping a legacy
    /// `DATA_NASCIMENTO` token onto the `BIRTH_DATE` field.
    pub fn with_tokens(
        mut self,
        entries: impl IntoIterator<Item = (String, String)>,
    ) -> Result<Self> {
        self.tokens.extend(
            entries
                .into_iter()
                .map(|(name, field)| PlaceholderToken { name, field }),
        );
        self.validate()?;
        Ok(self)
    }

    fn validate(&self) -> Result<()> {
        if self.open.is_empty() || self.close.is_empty() {
            return Err(TemplateError::AmbiguousTokenSet(
                "delimiters must be non-empty".to_string(),
            ));
        }

        for (i, token) in self.tokens.iter().enumerate() {
            if token.name.is_empty() {
                return Err(TemplateError::AmbiguousTokenSet(
                    "token name must be non-empty".to_string(),
                ));
            }
            // Any delimiter character in a name lets one token's literal be
            // a prefix of another's, producing overlapping matches
            if token
                .name
                .chars()
                .any(|c| self.open.contains(c) || self.close.contains(c))
            {
                return Err(TemplateError::AmbiguousTokenSet(format!(
                    "token name '{}' contains a delimiter character",
                    token.name
                )));
            }
            if self.tokens[..i].iter().any(|t| t.name == token.name) {
                return Err(TemplateError::AmbiguousTokenSet(format!(
                    "duplicate token name '{}'",
                    token.name
                )));
            }
        }

        Ok(())
    }

    /// Opening delimiter literal.
    #[inline]
    pub fn open(&self) -> &str {
        &self.open
    }

    /// Closing delimiter literal.
    #[inline]
    pub fn close(&self) -> &str {
        &self.close
    }

    /// Recognized tokens, in declaration order.
    #[inline]
    pub fn tokens(&self) -> &[PlaceholderToken] {
        &self.tokens
    }

    /// The full literal a token renders as, e.g. "{{NAME}}".
    pub fn literal(&self, name: &str) -> String {
        format!("{}{}{}", self.open, name, self.close)
    }

    /// Map a token name to its record field, if the name is recognized.
    pub fn field_for(&self, name: &str) -> Option<&str> {
        self.tokens
            .iter()
            .find(|t| t.name == name)
            .map(|t| t.field.as_str())
    }
}

impl Default for TokenSet {
    fn default() -> Self {
        Self::standard()
    }
}
