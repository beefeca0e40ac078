//! Tool directives parsed from model output
//!
//! The model requests a browser action by emitting a block of the form
//! `<browser_action name="navigate">https://example.com</browser_action>`.
//! A reply with no such block is a direct answer. Structurally broken
//! blocks and unknown tool names count as malformed tool syntax, which
//! terminates the turn as a model failure.

use skiff_browser::ScrollDirection;
use skiff_core::{Result, SkiffError};

const OPEN_PREFIX: &str = "<browser_action";
const CLOSE_TAG: &str = "</browser_action>";

/// One browser action requested by the model
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolCall {
    Navigate(String),
    Scroll(ScrollDirection),
    ExtractText,
    Screenshot,
}

impl ToolCall {
    /// Action name as recorded in the action log and UI notifications
    pub fn name(&self) -> &'static str {
        match self {
            ToolCall::Navigate(_) => "navigate",
            ToolCall::Scroll(_) => "scroll",
            ToolCall::ExtractText => "extract_text",
            ToolCall::Screenshot => "screenshot",
        }
    }

    /// Argument summary for the action log
    pub fn details(&self) -> String {
        match self {
            ToolCall::Navigate(url) => url.clone(),
            ToolCall::Scroll(direction) => direction.to_string(),
            ToolCall::ExtractText => "visible text".to_string(),
            ToolCall::Screenshot => "viewport".to_string(),
        }
    }
}

/// Parse every directive block in a model reply, in order
///
/// An empty vec means the reply is a direct answer. The caller honors only
/// the first call; the rest are its to discard.
pub fn parse_tool_calls(text: &str) -> Result<Vec<ToolCall>> {
    let mut calls = Vec::new();
    let mut remaining = text;

    while let Some(start) = remaining.find(OPEN_PREFIX) {
        let after_open = &remaining[start + OPEN_PREFIX.len()..];

        let attr_end = after_open.find('>').ok_or_else(|| {
            SkiffError::Model("Malformed tool directive: unterminated opening tag".to_string())
        })?;
        let attrs = &after_open[..attr_end];

        let body_and_rest = &after_open[attr_end + 1..];
        let body_end = body_and_rest.find(CLOSE_TAG).ok_or_else(|| {
            SkiffError::Model("Malformed tool directive: missing closing tag".to_string())
        })?;
        let body = body_and_rest[..body_end].trim();

        let name = parse_name_attr(attrs).ok_or_else(|| {
            SkiffError::Model("Malformed tool directive: missing name attribute".to_string())
        })?;

        calls.push(build_call(&name, body)?);

        remaining = &body_and_rest[body_end + CLOSE_TAG.len()..];
    }

    Ok(calls)
}

/// Extract the value of `name="..."` from the attribute text
fn parse_name_attr(attrs: &str) -> Option<String> {
    let idx = attrs.find("name=")?;
    let rest = &attrs[idx + "name=".len()..];
    let quote = rest.chars().next()?;
    if quote != '"' && quote != '\'' {
        return None;
    }
    let inner = &rest[1..];
    let end = inner.find(quote)?;
    Some(inner[..end].to_string())
}

fn build_call(name: &str, body: &str) -> Result<ToolCall> {
    match name {
        "navigate" => {
            if body.is_empty() {
                return Err(SkiffError::Model(
                    "Malformed tool directive: navigate needs a URL".to_string(),
                ));
            }
            Ok(ToolCall::Navigate(body.to_string()))
        }
        "scroll" => {
            let direction = body
                .parse::<ScrollDirection>()
                .map_err(|e| SkiffError::Model(format!("Malformed tool directive: {}", e)))?;
            Ok(ToolCall::Scroll(direction))
        }
        "extract_text" => Ok(ToolCall::ExtractText),
        "screenshot" => Ok(ToolCall::Screenshot),
        other => Err(SkiffError::Model(format!(
            "Unknown tool '{}' requested by model",
            other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_text_has_no_calls() {
        let calls = parse_tool_calls("Paris is the capital of France.").unwrap();
        assert!(calls.is_empty());
    }

    #[test]
    fn test_parse_navigate() {
        let calls = parse_tool_calls(
            "Let me look that up.\n<browser_action name=\"navigate\">https://example.com</browser_action>",
        )
        .unwrap();
        assert_eq!(
            calls,
            vec![ToolCall::Navigate("https://example.com".to_string())]
        );
    }

    #[test]
    fn test_parse_all_tools() {
        assert_eq!(
            parse_tool_calls("<browser_action name=\"scroll\">down</browser_action>").unwrap(),
            vec![ToolCall::Scroll(ScrollDirection::Down)]
        );
        assert_eq!(
            parse_tool_calls("<browser_action name=\"extract_text\"></browser_action>").unwrap(),
            vec![ToolCall::ExtractText]
        );
        assert_eq!(
            parse_tool_calls("<browser_action name=\"screenshot\"></browser_action>").unwrap(),
            vec![ToolCall::Screenshot]
        );
    }

    #[test]
    fn test_single_quoted_name() {
        let calls =
            parse_tool_calls("<browser_action name='screenshot'></browser_action>").unwrap();
        assert_eq!(calls, vec![ToolCall::Screenshot]);
    }

    #[test]
    fn test_multiple_calls_kept_in_order() {
        let text = "<browser_action name=\"navigate\">https://a.example</browser_action>\n\
                    <browser_action name=\"scroll\">down</browser_action>";
        let calls = parse_tool_calls(text).unwrap();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0], ToolCall::Navigate("https://a.example".to_string()));
        assert_eq!(calls[1], ToolCall::Scroll(ScrollDirection::Down));
    }

    #[test]
    fn test_unknown_tool_is_malformed() {
        let err = parse_tool_calls("<browser_action name=\"teleport\">mars</browser_action>")
            .unwrap_err();
        assert!(matches!(err, SkiffError::Model(_)));
    }

    #[test]
    fn test_missing_closing_tag_is_malformed() {
        let err =
            parse_tool_calls("<browser_action name=\"navigate\">https://example.com").unwrap_err();
        assert!(matches!(err, SkiffError::Model(_)));
    }

    #[test]
    fn test_empty_navigate_is_malformed() {
        assert!(parse_tool_calls("<browser_action name=\"navigate\"></browser_action>").is_err());
    }

    #[test]
    fn test_bad_scroll_direction_is_malformed() {
        assert!(parse_tool_calls("<browser_action name=\"scroll\">left</browser_action>").is_err());
    }

    #[test]
    fn test_names_and_details() {
        let call = ToolCall::Navigate("https://example.com".to_string());
        assert_eq!(call.name(), "navigate");
        assert_eq!(call.details(), "https://example.com");

        assert_eq!(ToolCall::Scroll(ScrollDirection::Up).details(), "up");
        assert_eq!(ToolCall::Screenshot.details(), "viewport");
    }
}
