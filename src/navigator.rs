//! Page location and redirects.

use std::sync::{Mutex, PoisonError};

use tracing::info;

/// The page's location. Redirects replace the current path.
pub trait Navigator: Send + Sync {
    fn current_path(&self) -> String;
    fn navigate(&self, path: &str);
}

/// In-process navigator that records every redirect.
#[derive(Debug)]
pub struct MemoryNavigator {
    state: Mutex<NavState>,
}

#[derive(Debug)]
struct NavState {
    current: String,
    history: Vec<String>,
}

impl MemoryNavigator {
    #[must_use]
    pub fn new(initial_path: &str) -> Self {
        Self { state: Mutex::new(NavState { current: initial_path.to_owned(), history: Vec::new() }) }
    }

    /// Paths navigated to, oldest first. The initial path is not included.
    #[must_use]
    pub fn history(&self) -> Vec<String> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner).history.clone()
    }

    #[must_use]
    pub fn last_redirect(&self) -> Option<String> {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .history
            .last()
            .cloned()
    }
}

impl Navigator for MemoryNavigator {
    fn current_path(&self) -> String {
        self.state.lock().unwrap_or_else(PoisonError::into_inner).current.clone()
    }

    fn navigate(&self, path: &str) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        info!(from = %state.current, to = %path, "navigate");
        state.current = path.to_owned();
        state.history.push(path.to_owned());
    }
}

#[cfg(test)]
#[path = "navigator_test.rs"]
mod tests;
