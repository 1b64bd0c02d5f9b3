//! Trigger keyword detection.

use regex::{Regex, RegexBuilder};

/// Case-insensitive whole-word matcher for the trigger keyword
#[derive(Debug, Clone)]
pub struct TriggerMatcher {
    pattern: Regex,
}

impl TriggerMatcher {
    /// Compile a matcher for `keyword`.
    ///
    /// The keyword must begin and end with a word character; `#signal` would
    /// never match at a word boundary and is rejected by settings validation.
    ///
    /// # Examples
    ///
    /// ```
    /// use oxide_signal_core::trigger::TriggerMatcher;
    ///
    /// let matcher = TriggerMatcher::new("signal").unwrap();
    /// assert!(matcher.matches("Any Signal today?"));
    /// assert!(!matcher.matches("signals"));
    /// ```
    ///
    /// # Errors
    ///
    /// Returns an error if the resulting pattern exceeds regex size limits.
    pub fn new(keyword: &str) -> Result<Self, regex::Error> {
        let pattern = RegexBuilder::new(&format!(r"\b{}\b", regex::escape(keyword.trim())))
            .case_insensitive(true)
            .build()?;
        Ok(Self { pattern })
    }

    /// Returns true if the keyword appears as a whole word in `text`.
    #[must_use]
    pub fn matches(&self, text: &str) -> bool {
        self.pattern.is_match(text)
    }
}
