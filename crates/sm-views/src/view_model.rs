use serde::{Deserialize, Serialize};

/// Everything a set of story controls renders
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StoryViewModel {
    /// Index shown as current; 0 until the engine reports otherwise
    pub current: usize,
    pub total: usize,
    pub title: Option<String>,
    pub description: Option<String>,
    pub can_previous: bool,
    pub can_next: bool,
    /// The map loaded and the engine is driving it
    pub ready: bool,
    /// Why the map could not be initialized
    pub failed: Option<String>,
}

impl StoryViewModel {
    /// Whether dot `index` marks the current step
    pub fn is_current(&self, index: usize) -> bool {
        self.total > 0 && index == self.current
    }
}

/// Accessible label of the dot for step `index`
pub fn step_label(index: usize) -> String {
    format!("Go to step {}", index + 1)
}
