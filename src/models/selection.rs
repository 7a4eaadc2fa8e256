//! Selection requests routed through the host UI

use serde::{Deserialize, Serialize};

/// Index reported by the host when the user dismisses a selection
pub const CANCELLED: i32 = -1;

/// One row of a selection list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectionItem {
    pub label: String,
    pub value: String,
}

impl SelectionItem {
    pub fn new(label: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            value: value.into(),
        }
    }
}

/// A list presented to the user, answered exactly once with an index
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectionRequest {
    pub title: String,
    pub items: Vec<SelectionItem>,
    pub default_index: usize,
}

impl SelectionRequest {
    pub fn new(title: impl Into<String>, items: Vec<SelectionItem>) -> Self {
        Self {
            title: title.into(),
            items,
            default_index: 0,
        }
    }

    pub fn with_default(mut self, index: usize) -> Self {
        self.default_index = index.min(self.items.len().saturating_sub(1));
        self
    }

    /// Resolve a host answer to an item, `None` for cancel or out of range
    pub fn item(&self, index: i32) -> Option<&SelectionItem> {
        usize::try_from(index).ok().and_then(|i| self.items.get(i))
    }
}

/// One-shot continuation invoked with the chosen index or [`CANCELLED`]
pub type SelectionCallback = Box<dyn FnOnce(i32) + Send + 'static>;

/// One-shot continuation invoked with the entered text, `None` when dismissed
pub type InputCallback = Box<dyn FnOnce(Option<String>) + Send + 'static>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_item_lookup_rejects_cancel() {
        let request = SelectionRequest::new(
            "Boards",
            vec![SelectionItem::new("Uno | uno", "uno")],
        );
        assert!(request.item(CANCELLED).is_none());
        assert!(request.item(3).is_none());
        assert_eq!(request.item(0).map(|i| i.value.as_str()), Some("uno"));
    }

    #[test]
    fn test_default_index_is_clamped() {
        let request =
            SelectionRequest::new("x", vec![SelectionItem::new("a", "a")]).with_default(9);
        assert_eq!(request.default_index, 0);
    }
}
