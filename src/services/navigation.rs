use std::sync::Mutex;

/// View-side navigation the synchronizer drives
pub trait Navigator: Send + Sync {
    fn current_path(&self) -> String;
    fn redirect(&self, path: &str);
    /// Re-render the current view so permission changes take effect
    fn reload(&self);
}

#[derive(Debug, Default)]
struct NavigationState {
    current: String,
    history: Vec<String>,
    reloads: usize,
}

/// Headless navigator that records where the session was sent
#[derive(Debug, Default)]
pub struct InMemoryNavigator {
    state: Mutex<NavigationState>,
}

impl InMemoryNavigator {
    pub fn new(start_path: impl Into<String>) -> Self {
        Self {
            state: Mutex::new(NavigationState {
                current: start_path.into(),
                history: Vec::new(),
                reloads: 0,
            }),
        }
    }

    /// Paths redirected to, oldest first
    pub fn history(&self) -> Vec<String> {
        self.lock().history.clone()
    }

    pub fn reload_count(&self) -> usize {
        self.lock().reloads
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, NavigationState> {
        // A panic while holding the lock leaves plain data behind; keep going
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Navigator for InMemoryNavigator {
    fn current_path(&self) -> String {
        self.lock().current.clone()
    }

    fn redirect(&self, path: &str) {
        let mut state = self.lock();
        tracing::info!(from = %state.current, to = %path, "redirecting");
        state.current = path.to_string();
        state.history.push(path.to_string());
    }

    fn reload(&self) {
        let mut state = self.lock();
        tracing::info!(path = %state.current, "reloading view");
        state.reloads += 1;
    }
}
