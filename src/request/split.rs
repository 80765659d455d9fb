//! Bracket-Aware Expression Splitting
//!
//! Filter and having queries are comma-separated lists of tokens whose
//! value lists also contain commas, inside square brackets. A token break
//! is a comma immediately following a closing bracket; commas at bracket
//! depth stay inside the token. Nested or unbalanced brackets have no
//! meaning in the grammar and are rejected outright.

/// Structural bracket problems in an expression list
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum BracketSplitError {
    /// More closing than opening brackets, or an unclosed bracket
    Unbalanced,
    /// An opening bracket inside a bracketed section
    Nested,
}

/// Split an expression list on commas that follow a closing bracket
pub(crate) fn split_bracketed_list(input: &str) -> Result<Vec<&str>, BracketSplitError> {
    let mut tokens = Vec::new();
    let mut depth = 0usize;
    let mut token_start = 0usize;
    let mut previous = '\0';

    for (index, c) in input.char_indices() {
        match c {
            '[' => {
                if depth > 0 {
                    return Err(BracketSplitError::Nested);
                }
                depth += 1;
            }
            ']' => {
                if depth == 0 {
                    return Err(BracketSplitError::Unbalanced);
                }
                depth -= 1;
            }
            ',' if depth == 0 && previous == ']' => {
                tokens.push(&input[token_start..index]);
                token_start = index + 1;
            }
            _ => {}
        }
        previous = c;
    }

    if depth != 0 {
        return Err(BracketSplitError::Unbalanced);
    }

    // A trailing comma leaves an empty tail; swallow it
    let tail = &input[token_start..];
    if !tail.is_empty() || tokens.is_empty() {
        tokens.push(tail);
    }
    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_token() {
        assert_eq!(
            split_bracketed_list("age.id-in[5,6,7]").unwrap(),
            vec!["age.id-in[5,6,7]"]
        );
    }

    #[test]
    fn test_splits_only_after_closing_bracket() {
        assert_eq!(
            split_bracketed_list("age.id-in[5,6],gender.id-eq[m]").unwrap(),
            vec!["age.id-in[5,6]", "gender.id-eq[m]"]
        );
    }

    #[test]
    fn test_commas_inside_brackets_stay_in_the_token() {
        assert_eq!(
            split_bracketed_list("city.name-in[New York,Los Angeles]").unwrap(),
            vec!["city.name-in[New York,Los Angeles]"]
        );
    }

    #[test]
    fn test_comma_not_after_bracket_does_not_split() {
        // Garbage between tokens is the token parser's problem
        assert_eq!(
            split_bracketed_list("a-eq[1]x,b-eq[2]").unwrap(),
            vec!["a-eq[1]x,b-eq[2]"]
        );
    }

    #[test]
    fn test_trailing_comma_is_ignored() {
        assert_eq!(split_bracketed_list("a-eq[1],").unwrap(), vec!["a-eq[1]"]);
    }

    #[test]
    fn test_unbalanced_brackets() {
        assert_eq!(
            split_bracketed_list("a-eq[1"),
            Err(BracketSplitError::Unbalanced)
        );
        assert_eq!(
            split_bracketed_list("a-eq]1["),
            Err(BracketSplitError::Unbalanced)
        );
    }

    #[test]
    fn test_nested_brackets() {
        assert_eq!(
            split_bracketed_list("a-eq[[1]]"),
            Err(BracketSplitError::Nested)
        );
    }
}
