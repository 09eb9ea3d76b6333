// core/rules/grammar.rs
use crate::error::ParseError;
use crate::rules::Rule;

/// Parses one line of rule text.
///
/// `name/` is a directory rule, `"*.ext"` an extension rule and anything else
/// an exact file name. Blank input yields `Ok(None)`.
pub fn parse_rule_line(line: &str) -> Result<Option<Rule>, ParseError> {
    let text = line.trim();
    if text.is_empty() {
        return Ok(None);
    }

    if let Some(dir) = text.strip_suffix('/') {
        let name = dir.trim_end_matches('/');
        if name.is_empty() {
            return Err(ParseError::Empty);
        }
        return Ok(Some(Rule::DirectoryName(name.to_string())));
    }

    if let Some(quoted) = strip_quotes(text) {
        let Some(suffix) = quoted.strip_prefix('*') else {
            return Err(ParseError::MissingWildcard(quoted.to_string()));
        };
        let Some(extension) = suffix.strip_prefix('.') else {
            return Err(ParseError::MissingDot(quoted.to_string()));
        };
        if extension.is_empty() {
            return Err(ParseError::EmptySuffix(quoted.to_string()));
        }
        if extension.contains('*') {
            return Err(ParseError::UnsupportedWildcard(quoted.to_string()));
        }
        return Ok(Some(Rule::ExtensionGlob(quoted.to_string())));
    }

    Ok(Some(Rule::ExactFileName(text.to_string())))
}

/// Parses a single rule, treating blank text as an error.
pub fn parse_rule(text: &str) -> Result<Rule, ParseError> {
    parse_rule_line(text)?.ok_or(ParseError::Empty)
}

fn strip_quotes(text: &str) -> Option<&str> {
    if text.len() >= 2 && text.starts_with('"') && text.ends_with('"') {
        Some(&text[1..text.len() - 1])
    } else {
        None
    }
}
