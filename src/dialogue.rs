//! Conversation dialogue module: pending-state tags and input validation.

use lazy_static::lazy_static;
use regex::Regex;

use crate::models::ItemId;

/// The follow-up text a user is expected to send
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StateTag {
    WaitingForName,
    WaitingForGenre,
    WaitingForBudget,
    WaitingForGameSelection,
    WaitingForRemoveId,
    WaitingForUnsubscribeId,
}

/// Genres suggested when asking for a genre
pub const POPULAR_GENRES: &[&str] = &[
    "Action",
    "Adventure",
    "RPG",
    "Strategy",
    "Simulation",
    "Indie",
    "Casual",
    "Racing",
    "Sports",
];

/// Budgets above this are refused with a hint
pub const MAX_BUDGET_DOLLARS: f64 = 100.0;

const ZERO_BUDGET_EPSILON: f64 = 0.0001;

lazy_static! {
    static ref SELECTION_ID_REGEX: Regex =
        Regex::new(r"\(ID:\s*(\d+)\)").expect("Selection pattern should be valid");
}

/// A parsed budget ceiling
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Budget {
    /// Only free items
    Free,
    /// Items priced at or below this many dollars
    UpTo(f64),
}

/// Validates an item name query
pub fn validate_name(input: &str) -> Result<String, &'static str> {
    let trimmed = input.trim();

    if trimmed.is_empty() {
        return Err("name-empty");
    }

    Ok(trimmed.to_string())
}

/// Validates a genre query
pub fn validate_genre(input: &str) -> Result<String, &'static str> {
    let trimmed = input.trim();

    if trimmed.chars().count() < 2 {
        return Err("genre-too-short");
    }

    Ok(trimmed.to_string())
}

/// Parses a budget in dollars, accepting `,` as the decimal separator
pub fn parse_budget(input: &str) -> Result<Budget, &'static str> {
    let normalized = input.trim().replace(',', ".");

    let value: f64 = normalized.parse().map_err(|_| "budget-invalid")?;
    if !value.is_finite() || value < 0.0 {
        return Err("budget-invalid");
    }

    if value > MAX_BUDGET_DOLLARS {
        return Err("budget-too-high");
    }

    if value.abs() < ZERO_BUDGET_EPSILON {
        Ok(Budget::Free)
    } else {
        Ok(Budget::UpTo(value))
    }
}

/// Parses an item id typed by the user
pub fn parse_item_id(input: &str) -> Result<ItemId, &'static str> {
    input.trim().parse().map_err(|_| "id-invalid")
}

/// Extracts the id from a selection label such as `"Foo (ID: 42)"`
pub fn extract_selection_id(input: &str) -> Option<ItemId> {
    SELECTION_ID_REGEX
        .captures(input)
        .and_then(|caps| caps.get(1))
        .and_then(|id| id.as_str().parse().ok())
}

/// Whether the text asks to go back to the main menu
pub fn is_back(input: &str, back_label: &str) -> bool {
    let trimmed = input.trim();
    trimmed == "back" || trimmed == back_label.trim()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name_validation() {
        assert_eq!(validate_name("  Portal 2 ").unwrap(), "Portal 2");
        assert_eq!(validate_name("   "), Err("name-empty"));
    }

    #[test]
    fn test_genre_validation() {
        assert!(validate_genre("RPG").is_ok());
        assert_eq!(validate_genre(" a "), Err("genre-too-short"));
    }

    #[test]
    fn test_budget_parsing() {
        assert_eq!(parse_budget("0"), Ok(Budget::Free));
        assert_eq!(parse_budget("19,99"), Ok(Budget::UpTo(19.99)));
        assert_eq!(parse_budget("150"), Err("budget-too-high"));
        assert_eq!(parse_budget("abc"), Err("budget-invalid"));
        assert_eq!(parse_budget("-5"), Err("budget-invalid"));
        assert_eq!(parse_budget("NaN"), Err("budget-invalid"));
    }

    #[test]
    fn test_selection_id_extraction() {
        assert_eq!(extract_selection_id("Foo (ID: 42)"), Some(42));
        assert_eq!(extract_selection_id("Foo (ID:7) – $1.99"), Some(7));
        assert_eq!(extract_selection_id("A (ID: 1) B (ID: 2)"), Some(1));
        assert_eq!(extract_selection_id("Foo 42"), None);
    }

    #[test]
    fn test_back_detection() {
        assert!(is_back(" back ", "⬅️ Back"));
        assert!(!is_back("BACK", "⬅️ Back"));
        assert!(!is_back("Back", "⬅️ Back"));
        assert!(is_back("⬅️ Back", "⬅️ Back"));
        assert!(!is_back("backpack", "⬅️ Back"));
    }
}
