use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

pub type ExpenseId = i64;

/// Returned when an expense breaks a business invariant.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid expense: {0}")]
pub struct InvalidExpense(pub String);

/// A single tracked expense.
///
/// An `id` of `0` means the expense has not been persisted yet; the store
/// assigns the real identifier on creation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Expense {
    pub id: ExpenseId,
    pub amount: f64,
    pub title: String,
    pub note: String,
    #[serde(deserialize_with = "null_as_empty")]
    pub tags: Vec<String>,
}

/// `"tags": null` reads as no tags, the same as a missing field.
fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<String>>::deserialize(deserializer)?.unwrap_or_default())
}

impl Expense {
    pub fn new(title: impl Into<String>, amount: f64) -> Self {
        Self {
            title: title.into(),
            amount,
            ..Self::default()
        }
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = note.into();
        self
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    pub fn is_persisted(&self) -> bool {
        self.id != 0
    }

    /// Check the invariants that must hold before an expense is stored.
    /// This does not sanitize; call [`Expense::sanitize`] first on untrusted input.
    pub fn validate(&self) -> Result<(), InvalidExpense> {
        if self.title.is_empty() {
            return Err(InvalidExpense("title must not be empty".to_string()));
        }
        // `!(x > 0)` so that NaN is rejected too
        if !(self.amount > 0.0) {
            return Err(InvalidExpense("amount must be greater than zero".to_string()));
        }
        Ok(())
    }

    /// Return a cleaned copy: text fields trimmed and HTML-escaped, blank tags dropped.
    pub fn sanitize(&self) -> Expense {
        let tags = self
            .tags
            .iter()
            .map(|tag| tag.trim())
            .filter(|tag| !tag.is_empty())
            .map(escape_html)
            .collect();

        Expense {
            id: self.id,
            amount: self.amount,
            title: escape_html(self.title.trim()),
            note: escape_html(self.note.trim()),
            tags,
        }
    }
}

/// Entities produced by [`escape_html`]. An `&` that already opens one of
/// these is kept verbatim so that escaping twice changes nothing.
const ENTITIES: [&str; 5] = ["&amp;", "&lt;", "&gt;", "&#39;", "&#34;"];

/// Escape `<`, `>`, `&`, `'` and `"` as HTML entities.
pub fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for (idx, ch) in input.char_indices() {
        match ch {
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '\'' => out.push_str("&#39;"),
            '"' => out.push_str("&#34;"),
            '&' if ENTITIES.iter().any(|e| input[idx..].starts_with(e)) => out.push('&'),
            '&' => out.push_str("&amp;"),
            _ => out.push(ch),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCRIPT: &str = "  <script>alert('hello')</script>  ";
    const ESCAPED: &str = "&lt;script&gt;alert(&#39;hello&#39;)&lt;/script&gt;";

    #[test]
    fn test_validate_rejects_empty_title() {
        let err = Expense::new("", 100.0).validate().unwrap_err();
        assert_eq!(err, InvalidExpense("title must not be empty".into()));
    }

    #[test]
    fn test_validate_rejects_non_positive_amount() {
        for amount in [-100.0, 0.0, -0.0, f64::NAN] {
            let err = Expense::new("lunch", amount).validate().unwrap_err();
            assert_eq!(err.0, "amount must be greater than zero");
        }
    }

    #[test]
    fn test_validate_accepts_good_expense() {
        assert!(Expense::new("good expense", 100.0).validate().is_ok());
        assert!(Expense::new("tiny", 0.01).validate().is_ok());
    }

    #[test]
    fn test_invalid_expense_message() {
        let err = Expense::new("", 1.0).validate().unwrap_err();
        assert_eq!(err.to_string(), "invalid expense: title must not be empty");
    }

    #[test]
    fn test_sanitize_trims_and_escapes() {
        let expense = Expense::new(SCRIPT, 100.0)
            .with_note(SCRIPT)
            .with_tags([SCRIPT]);

        let sanitized = expense.sanitize();

        assert_eq!(sanitized.title, ESCAPED);
        assert_eq!(sanitized.note, ESCAPED);
        assert_eq!(sanitized.tags, vec![ESCAPED.to_string()]);
        assert_eq!(sanitized.amount, 100.0);
    }

    #[test]
    fn test_sanitize_script_title() {
        let sanitized = Expense::new("  <script>alert('x')</script>  ", 1.0).sanitize();
        assert_eq!(
            sanitized.title,
            "&lt;script&gt;alert(&#39;x&#39;)&lt;/script&gt;"
        );
    }

    #[test]
    fn test_sanitize_blank_fields() {
        let sanitized = Expense::new(" ", 100.0)
            .with_note(" ")
            .with_tags([" "])
            .sanitize();

        assert_eq!(sanitized.title, "");
        assert_eq!(sanitized.note, "");
        assert!(sanitized.tags.is_empty());
    }

    #[test]
    fn test_sanitize_keeps_tag_order_and_drops_blanks() {
        let sanitized = Expense::new("food", 1.0)
            .with_tags([" b ", "", "a", "\t", "c"])
            .sanitize();
        assert_eq!(sanitized.tags, vec!["b", "a", "c"]);
    }

    #[test]
    fn test_sanitize_leaves_clean_expense_alone() {
        let expense = Expense::new("good expense", 100.0)
            .with_note("good note")
            .with_tags(["good", "tags"]);
        assert_eq!(expense.sanitize(), expense);
    }

    #[test]
    fn test_sanitize_does_not_touch_input() {
        let expense = Expense::new("  a  ", 5.0);
        let _ = expense.sanitize();
        assert_eq!(expense.title, "  a  ");
    }

    #[test]
    fn test_sanitize_preserves_id_and_amount() {
        let mut expense = Expense::new("x", 12.5);
        expense.id = 42;
        let sanitized = expense.sanitize();
        assert_eq!(sanitized.id, 42);
        assert_eq!(sanitized.amount, 12.5);
    }

    #[test]
    fn test_sanitize_is_idempotent() {
        let samples = [
            Expense::new(SCRIPT, 1.0).with_note(SCRIPT).with_tags([SCRIPT, " "]),
            Expense::new("fish & chips", 9.5).with_note("\"quoted\" & 'single'"),
            Expense::new("&amp; &lt;b&gt;", 3.0).with_tags(["&", "&&", "&#39"]),
            Expense::new("   ", 0.0).with_tags(["  x  ", "y"]),
        ];

        for expense in samples {
            let once = expense.sanitize();
            let twice = once.sanitize();
            assert_eq!(once, twice, "sanitize not idempotent for {:?}", expense);
        }
    }

    #[test]
    fn test_escape_html() {
        assert_eq!(escape_html("a < b > c"), "a &lt; b &gt; c");
        assert_eq!(escape_html("\"hi\""), "&#34;hi&#34;");
        assert_eq!(escape_html("fish & chips"), "fish &amp; chips");
        assert_eq!(escape_html("&lt;"), "&lt;");
        assert_eq!(escape_html("&#39"), "&amp;#39");
    }

    #[test]
    fn test_deserialize_missing_fields_default() {
        let expense: Expense = serde_json::from_str(r#"{"title":"tea","amount":2}"#).unwrap();
        assert_eq!(expense.id, 0);
        assert!(!expense.is_persisted());
        assert_eq!(expense.note, "");
        assert!(expense.tags.is_empty());
    }

    #[test]
    fn test_deserialize_null_tags_as_empty() {
        let expense: Expense =
            serde_json::from_str(r#"{"title":"tea","amount":2,"tags":null}"#).unwrap();
        assert!(expense.tags.is_empty());

        let expense: Expense =
            serde_json::from_str(r#"{"title":"tea","amount":2,"tags":["a"]}"#).unwrap();
        assert_eq!(expense.tags, vec!["a"]);
    }
}
