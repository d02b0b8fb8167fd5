//! Identifier case conversion.

/// Convert an identifier to snake_case.
///
/// Examples:
/// - `netPresentValue` -> `net_present_value`
/// - `calcNPV` -> `calc_npv`
/// - `HTTPRate` -> `http_rate`
/// - `already_snake` -> `already_snake`
pub fn to_snake_case(s: &str) -> String {
    let chars: Vec<char> = s.chars().collect();
    let mut result = String::with_capacity(s.len() + 4);

    for (i, &c) in chars.iter().enumerate() {
        if c == '-' || c.is_whitespace() {
            if !result.ends_with('_') {
                result.push('_');
            }
            continue;
        }
        if c.is_uppercase() {
            let prev = i.checked_sub(1).map(|p| chars[p]);
            let next = chars.get(i + 1).copied();
            let boundary = match prev {
                Some(p) if p.is_lowercase() || p.is_ascii_digit() => true,
                Some(p) if p.is_uppercase() => next.is_some_and(char::is_lowercase),
                _ => false,
            };
            if boundary && !result.ends_with('_') {
                result.push('_');
            }
            result.extend(c.to_lowercase());
        } else {
            result.push(c);
        }
    }

    result
}

/// Apply a serde `rename_all` rule to a variant or field name.
///
/// Returns `None` for rules serde does not define.
pub fn apply_rename_rule(rule: &str, name: &str) -> Option<String> {
    let snake = to_snake_case(name);
    let renamed = match rule {
        "lowercase" => name.to_lowercase(),
        "UPPERCASE" => name.to_uppercase(),
        "snake_case" => snake,
        "SCREAMING_SNAKE_CASE" => snake.to_uppercase(),
        "kebab-case" => snake.replace('_', "-"),
        "SCREAMING-KEBAB-CASE" => snake.replace('_', "-").to_uppercase(),
        "camelCase" => join_capitalized(&snake, false),
        "PascalCase" => join_capitalized(&snake, true),
        _ => return None,
    };
    Some(renamed)
}

fn join_capitalized(snake: &str, capitalize_first: bool) -> String {
    let mut out = String::with_capacity(snake.len());
    for (i, word) in snake.split('_').filter(|w| !w.is_empty()).enumerate() {
        let mut chars = word.chars();
        if let Some(first) = chars.next() {
            if i > 0 || capitalize_first {
                out.extend(first.to_uppercase());
            } else {
                out.push(first);
            }
            out.push_str(chars.as_str());
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_snake_case() {
        assert_eq!(to_snake_case("netPresentValue"), "net_present_value");
        assert_eq!(to_snake_case("calcNPV"), "calc_npv");
        assert_eq!(to_snake_case("HTTPRate"), "http_rate");
        assert_eq!(to_snake_case("already_snake"), "already_snake");
        // Edge cases - separators collapse into one underscore
        assert_eq!(to_snake_case("loan-payment"), "loan_payment");
        assert_eq!(to_snake_case("rate2Pct"), "rate2_pct");
    }

    #[test]
    fn test_apply_rename_rule() {
        assert_eq!(apply_rename_rule("lowercase", "FixedRate").as_deref(), Some("fixedrate"));
        assert_eq!(apply_rename_rule("snake_case", "FixedRate").as_deref(), Some("fixed_rate"));
        assert_eq!(
            apply_rename_rule("SCREAMING_SNAKE_CASE", "FixedRate").as_deref(),
            Some("FIXED_RATE")
        );
        assert_eq!(apply_rename_rule("kebab-case", "FixedRate").as_deref(), Some("fixed-rate"));
        assert_eq!(apply_rename_rule("camelCase", "FixedRate").as_deref(), Some("fixedRate"));
        assert_eq!(apply_rename_rule("PascalCase", "fixed_rate").as_deref(), Some("FixedRate"));
        assert_eq!(apply_rename_rule("Title Case", "FixedRate"), None);
    }
}
