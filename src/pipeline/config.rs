//! Runtime configuration - Thread-local mount settings.
//!
//! ```ignore
//! use spark_rx::pipeline::{set_placeholder_tag, placeholder_tag};
//!
//! set_placeholder_tag("rx-slot");
//! assert_eq!(placeholder_tag(), "rx-slot");
//! ```

use std::cell::RefCell;

/// Default tag of placeholder nodes.
pub const DEFAULT_PLACEHOLDER_TAG: &str = "span";

/// Prefix marking a prop as an event handler (`onclick` handles `click`).
pub const HANDLER_PREFIX: &str = "on";

thread_local! {
    static PLACEHOLDER_TAG: RefCell<String> = RefCell::new(DEFAULT_PLACEHOLDER_TAG.to_string());
}

/// Tag used for the placeholder nodes of dynamic subtrees and keyed lists.
pub fn placeholder_tag() -> String {
    PLACEHOLDER_TAG.with(|tag| tag.borrow().clone())
}

/// Set the placeholder tag for nodes created from now on.
pub fn set_placeholder_tag(tag: &str) {
    PLACEHOLDER_TAG.with(|current| *current.borrow_mut() = tag.to_string());
}

/// Prefix of handler prop names.
pub fn handler_prefix() -> &'static str {
    HANDLER_PREFIX
}

/// Event name handled by prop `name`, if it is a handler name.
///
/// `onclick` and `onClick` both handle `click`.
pub fn handler_event(name: &str) -> Option<String> {
    let event = name.strip_prefix(HANDLER_PREFIX)?;
    if event.is_empty() {
        return None;
    }
    Some(event.to_lowercase())
}

/// Restore defaults (for testing).
pub fn reset_config() {
    set_placeholder_tag(DEFAULT_PLACEHOLDER_TAG);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_placeholder_tag_roundtrip() {
        reset_config();
        assert_eq!(placeholder_tag(), "span");
        set_placeholder_tag("slot");
        assert_eq!(placeholder_tag(), "slot");
        reset_config();
        assert_eq!(placeholder_tag(), "span");
    }

    #[test]
    fn test_handler_event() {
        assert_eq!(handler_prefix(), "on");
        assert_eq!(handler_event("onclick"), Some("click".to_string()));
        assert_eq!(handler_event("onKeyPress"), Some("keypress".to_string()));
        assert_eq!(handler_event("on"), None);
        assert_eq!(handler_event("class"), None);
    }
}
