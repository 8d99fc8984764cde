//! The comment form: per-field validation rules and the messages shown for them.
//!
//! A field only reports errors once it is dirty, i.e. the user has edited it
//! (or tried to submit). Rules follow the usual forms semantic where length
//! checks ignore an empty value and leave it to `Required`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::data::Comment;

pub const AUTHOR_MIN_LEN: usize = 2;
pub const AUTHOR_MAX_LEN: usize = 25;
pub const DEFAULT_RATING: u8 = 5;
pub const RATING_RANGE: std::ops::RangeInclusive<u8> = 1..=5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rule {
    Required,
    MinLength(usize),
    MaxLength(usize),
}

impl Rule {
    pub fn key(self) -> &'static str {
        match self {
            Self::Required => "required",
            Self::MinLength(_) => "minlength",
            Self::MaxLength(_) => "maxlength",
        }
    }

    fn passes(self, value: &str) -> bool {
        let len = value.chars().count();
        match self {
            Self::Required => !value.is_empty(),
            Self::MinLength(min) => value.is_empty() || len >= min,
            Self::MaxLength(max) => len <= max,
        }
    }
}

type Rules = &'static [(Rule, &'static str)];

const AUTHOR_RULES: Rules = &[
    (Rule::Required, "Name is required."),
    (
        Rule::MinLength(AUTHOR_MIN_LEN),
        "Name must be at least 2 characters long.",
    ),
    (
        Rule::MaxLength(AUTHOR_MAX_LEN),
        "Name cannot be more than 25 characters long.",
    ),
];

const COMMENT_RULES: Rules = &[
    (Rule::Required, "Your comments are required."),
    (Rule::MinLength(1), "Please enter some comments to continue."),
];

const RATING_MESSAGE: &str = "Rating must be between 1 and 5.";

#[derive(Debug, Clone)]
pub struct Field {
    value: String,
    dirty: bool,
    rules: Rules,
}

impl Field {
    fn new(rules: Rules) -> Self {
        Self {
            value: String::new(),
            dirty: false,
            rules,
        }
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn set(&mut self, value: impl Into<String>) {
        self.value = value.into();
        self.dirty = true;
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Rules the current value breaks, in declaration order.
    pub fn errors(&self) -> Vec<Rule> {
        self.rules
            .iter()
            .filter(|(rule, _)| !rule.passes(&self.value))
            .map(|(rule, _)| *rule)
            .collect()
    }

    pub fn is_valid(&self) -> bool {
        self.rules.iter().all(|(rule, _)| rule.passes(&self.value))
    }

    /// Every failing rule's message joined by a space. Empty for a clean or valid field.
    pub fn message(&self) -> String {
        if !self.dirty {
            return String::new();
        }
        self.rules
            .iter()
            .filter(|(rule, _)| !rule.passes(&self.value))
            .map(|(_, message)| *message)
            .collect::<Vec<_>>()
            .join(" ")
    }

    fn reset(&mut self) {
        self.value.clear();
        self.dirty = false;
    }
}

/// Messages to display beside each field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FormErrors {
    pub author: String,
    pub rating: String,
    pub comment: String,
}

impl FormErrors {
    pub fn is_empty(&self) -> bool {
        self.author.is_empty() && self.rating.is_empty() && self.comment.is_empty()
    }
}

impl std::fmt::Display for FormErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let messages = [&self.author, &self.rating, &self.comment]
            .into_iter()
            .filter(|m| !m.is_empty())
            .map(String::as_str)
            .collect::<Vec<_>>();
        write!(f, "{}", messages.join(" "))
    }
}

#[derive(Debug, Clone)]
pub struct CommentForm {
    pub author: Field,
    rating: u8,
    rating_dirty: bool,
    pub comment: Field,
}

impl Default for CommentForm {
    fn default() -> Self {
        Self {
            author: Field::new(AUTHOR_RULES),
            rating: DEFAULT_RATING,
            rating_dirty: false,
            comment: Field::new(COMMENT_RULES),
        }
    }
}

impl CommentForm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_author(&mut self, author: impl Into<String>) {
        self.author.set(author);
    }

    pub fn set_comment(&mut self, comment: impl Into<String>) {
        self.comment.set(comment);
    }

    pub fn set_rating(&mut self, rating: u8) {
        self.rating = rating;
        self.rating_dirty = true;
    }

    pub fn rating(&self) -> u8 {
        self.rating
    }

    pub fn is_valid(&self) -> bool {
        self.author.is_valid() && self.comment.is_valid() && RATING_RANGE.contains(&self.rating)
    }

    /// Recompute the message of every field from its current state.
    pub fn form_errors(&self) -> FormErrors {
        let rating = if self.rating_dirty && !RATING_RANGE.contains(&self.rating) {
            RATING_MESSAGE.to_string()
        } else {
            String::new()
        };
        FormErrors {
            author: self.author.message(),
            rating,
            comment: self.comment.message(),
        }
    }

    /// Mark everything dirty and turn the input into a comment stamped with `now`.
    /// The form keeps its content, see [`CommentForm::submit`] for the resetting variant.
    pub fn build(&mut self, now: DateTime<Utc>) -> Result<Comment, FormErrors> {
        self.author.dirty = true;
        self.comment.dirty = true;
        self.rating_dirty = true;
        if !self.is_valid() {
            return Err(self.form_errors());
        }
        Ok(Comment {
            rating: self.rating,
            comment: self.comment.value.clone(),
            author: self.author.value.clone(),
            date: now,
        })
    }

    pub fn submit(&mut self, now: DateTime<Utc>) -> Result<Comment, FormErrors> {
        let comment = self.build(now)?;
        self.reset();
        Ok(comment)
    }

    pub fn reset(&mut self) {
        self.author.reset();
        self.comment.reset();
        self.rating = DEFAULT_RATING;
        self.rating_dirty = false;
    }
}

/// Parse a rating typed by a user, accepting only the 1 to 5 range.
pub fn parse_rating(raw: &str) -> Option<u8> {
    raw.trim()
        .parse::<u8>()
        .ok()
        .filter(|r| RATING_RANGE.contains(r))
}

/// Comment fields as they arrive from a client. Missing fields are left
/// empty so the form reports them like any other invalid input.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CommentInput {
    pub author: String,
    #[serde(deserialize_with = "lenient_rating")]
    pub rating: Option<i64>,
    pub comment: String,
}

/// Accepts a rating sent as a number or as a numeric string.
fn lenient_rating<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(i64),
        Text(String),
    }

    match Option::<Raw>::deserialize(deserializer)? {
        None => Ok(None),
        Some(Raw::Number(rating)) => Ok(Some(rating)),
        Some(Raw::Text(text)) => text
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| serde::de::Error::custom(format!("rating is not a number: {text}"))),
    }
}

impl From<CommentInput> for CommentForm {
    fn from(input: CommentInput) -> Self {
        let mut form = CommentForm::new();
        form.set_author(input.author);
        // anything beyond u8 is out of range all the same
        let rating = input.rating.map_or(DEFAULT_RATING, |r| u8::try_from(r).unwrap_or(0));
        form.set_rating(rating);
        form.set_comment(input.comment);
        form
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_form_has_no_message() {
        let form = CommentForm::new();
        assert!(!form.is_valid());
        assert!(form.form_errors().is_empty());
        assert_eq!(form.rating(), DEFAULT_RATING);
    }

    #[test]
    fn test_author_messages() {
        let mut form = CommentForm::new();

        form.set_author("");
        assert_eq!(form.form_errors().author, "Name is required.");

        form.set_author("A");
        assert_eq!(
            form.form_errors().author,
            "Name must be at least 2 characters long."
        );
        assert_eq!(form.author.errors(), vec![Rule::MinLength(AUTHOR_MIN_LEN)]);

        form.set_author("A".repeat(AUTHOR_MAX_LEN + 1));
        assert_eq!(
            form.form_errors().author,
            "Name cannot be more than 25 characters long."
        );

        form.set_author("Al");
        assert_eq!(form.form_errors().author, "");
    }

    #[test]
    fn test_length_counts_chars() {
        let mut form = CommentForm::new();
        form.set_author("李华");
        assert!(form.author.is_valid());
    }

    #[test]
    fn test_comment_messages_only_when_dirty() {
        let mut form = CommentForm::new();
        form.set_author("John Lemon");
        assert_eq!(form.form_errors().comment, "");

        form.set_comment("");
        assert_eq!(form.form_errors().comment, "Your comments are required.");
        assert_eq!(form.comment.errors()[0].key(), "required");
    }

    #[test]
    fn test_invalid_submit_marks_all_dirty() {
        let mut form = CommentForm::new();
        let errors = form.submit(Utc::now()).unwrap_err();
        assert_eq!(errors.author, "Name is required.");
        assert_eq!(errors.comment, "Your comments are required.");
        assert_eq!(errors.rating, "");
        assert!(form.author.is_dirty());
        assert_eq!(
            errors.to_string(),
            "Name is required. Your comments are required."
        );
    }

    #[test]
    fn test_bad_rating() {
        let mut form = CommentForm::new();
        form.set_author("John Lemon");
        form.set_comment("Tasty");
        form.set_rating(0);
        assert!(!form.is_valid());
        assert_eq!(form.form_errors().rating, RATING_MESSAGE);
    }

    #[test]
    fn test_submit_resets() {
        let now = Utc::now();
        let mut form = CommentForm::new();
        form.set_author("Ringo Starry");
        form.set_rating(4);
        form.set_comment("Ultimate, Reaching for the stars!");

        let comment = form.submit(now).unwrap();
        assert_eq!(comment.author, "Ringo Starry");
        assert_eq!(comment.rating, 4);
        assert_eq!(comment.date, now);

        assert_eq!(form.author.value(), "");
        assert_eq!(form.comment.value(), "");
        assert_eq!(form.rating(), DEFAULT_RATING);
        assert!(!form.author.is_dirty());
    }

    #[test]
    fn test_build_keeps_input() {
        let mut form = CommentForm::new();
        form.set_author("Paul");
        form.set_comment("Heaven");
        form.build(Utc::now()).unwrap();
        assert_eq!(form.author.value(), "Paul");
    }

    #[test]
    fn test_parse_rating() {
        assert_eq!(parse_rating(" 3 "), Some(3));
        assert_eq!(parse_rating("0"), None);
        assert_eq!(parse_rating("6"), None);
        assert_eq!(parse_rating("five"), None);
    }

    #[test]
    fn test_input_defaults_rating() {
        let input: CommentInput =
            serde_json::from_str(r#"{"author": "Paul", "comment": "Nice"}"#).unwrap();
        let form = CommentForm::from(input);
        assert_eq!(form.rating(), DEFAULT_RATING);
        assert!(form.is_valid());
    }

    #[test]
    fn test_input_missing_author_reaches_form() {
        let input: CommentInput = serde_json::from_str(r#"{"comment": "Nice"}"#).unwrap();
        let mut form = CommentForm::from(input);
        let errors = form.build(Utc::now()).unwrap_err();
        assert_eq!(errors.author, "Name is required.");
        assert_eq!(errors.comment, "");
    }

    #[test]
    fn test_input_rating_as_text_or_out_of_range() {
        let input: CommentInput =
            serde_json::from_str(r#"{"author": "Paul", "rating": "4", "comment": "Nice"}"#)
                .unwrap();
        assert_eq!(CommentForm::from(input).rating(), 4);

        let input: CommentInput =
            serde_json::from_str(r#"{"author": "Paul", "rating": 300, "comment": "Nice"}"#)
                .unwrap();
        let form = CommentForm::from(input);
        assert_eq!(form.form_errors().rating, RATING_MESSAGE);

        let input = serde_json::from_str::<CommentInput>(r#"{"rating": "five"}"#);
        assert!(input.is_err());
    }
}
