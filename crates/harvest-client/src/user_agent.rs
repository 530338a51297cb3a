use std::sync::Mutex;

use harvest_core::util::random_below;

/// Requests served by one User-Agent before a new one is drawn.
pub const DEFAULT_ROTATE_EVERY: usize = 5;

/// Realistic desktop and mobile browser User-Agent strings.
pub const USER_AGENTS: &[&str] = &[
    // Windows / Chrome
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 Chrome/119.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 Chrome/118.0.5993.90 Safari/537.36",
    // macOS / Safari
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 13_5) AppleWebKit/605.1.15 Safari/605.1.15",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 12_6) AppleWebKit/605.1.15 Safari/605.1.15",
    // Linux / Firefox
    "Mozilla/5.0 (X11; Linux x86_64) Gecko/20100101 Firefox/117.0",
    "Mozilla/5.0 (X11; Linux x86_64) Gecko/20100101 Firefox/116.0",
    // iPhone / Safari
    "Mozilla/5.0 (iPhone; CPU iPhone OS 16_6 like Mac OS X) AppleWebKit/605.1.15 Safari/605.1.15",
    "Mozilla/5.0 (iPhone; CPU iPhone OS 15_7 like Mac OS X) AppleWebKit/605.1.15 Safari/605.1.15",
    // Android / Chrome
    "Mozilla/5.0 (Linux; Android 13; Pixel 7) AppleWebKit/537.36 Chrome/120.0.0.0 Mobile Safari/537.36",
    "Mozilla/5.0 (Linux; Android 12; SM-G991B) AppleWebKit/537.36 Chrome/119.0.0.0 Mobile Safari/537.36",
    // iPad / Safari
    "Mozilla/5.0 (iPad; CPU OS 16_6 like Mac OS X) AppleWebKit/605.1.15 Safari/605.1.15",
    // Edge / Windows
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 Chrome/120.0.0.0 Safari/537.36 Edg/120.0.0.0",
    // Opera / Windows
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 Chrome/118.0.5993.90 Safari/537.36 OPR/104.0.0.0",
];

#[derive(Debug)]
struct RotationState {
    served: usize,
    current: usize,
}

/// Hands out a User-Agent per request, drawing a new random one from the
/// pool every `rotate_every` requests.
#[derive(Debug)]
pub struct UserAgentRotator {
    pool: Vec<String>,
    rotate_every: usize,
    state: Mutex<RotationState>,
}

impl UserAgentRotator {
    /// Built-in pool, new User-Agent every [`DEFAULT_ROTATE_EVERY`] requests.
    pub fn new() -> Self {
        Self::with_pool(
            USER_AGENTS.iter().map(|ua| ua.to_string()).collect(),
            DEFAULT_ROTATE_EVERY,
        )
    }

    /// Custom pool. An empty pool falls back to the built-in one.
    pub fn with_pool(pool: Vec<String>, rotate_every: usize) -> Self {
        let pool = if pool.is_empty() {
            USER_AGENTS.iter().map(|ua| ua.to_string()).collect()
        } else {
            pool
        };
        Self {
            pool,
            rotate_every: rotate_every.max(1),
            state: Mutex::new(RotationState {
                served: 0,
                current: 0,
            }),
        }
    }

    pub fn rotate_every(&self) -> usize {
        self.rotate_every
    }

    /// User-Agent for the next request.
    pub fn next_user_agent(&self) -> &str {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        if state.served % self.rotate_every == 0 {
            state.current = random_below(self.pool.len() as u64) as usize;
        }
        state.served += 1;
        &self.pool[state.current]
    }
}

impl Default for UserAgentRotator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_agent_constant_within_rotation_window() {
        let rotator = UserAgentRotator::new();
        let served: Vec<String> = (0..15)
            .map(|_| rotator.next_user_agent().to_string())
            .collect();

        for window in served.chunks(DEFAULT_ROTATE_EVERY) {
            assert!(window.iter().all(|ua| ua == &window[0]), "{window:?}");
        }
    }

    #[test]
    fn user_agents_come_from_pool() {
        let pool = vec!["agent-a".to_string(), "agent-b".to_string()];
        let rotator = UserAgentRotator::with_pool(pool.clone(), 1);
        for _ in 0..20 {
            assert!(pool.contains(&rotator.next_user_agent().to_string()));
        }
    }

    #[test]
    fn empty_pool_falls_back_to_builtin() {
        let rotator = UserAgentRotator::with_pool(Vec::new(), 0);
        assert_eq!(rotator.rotate_every(), 1);
        assert!(USER_AGENTS.contains(&rotator.next_user_agent()));
    }

    #[test]
    fn builtin_pool_is_desktop_and_mobile() {
        assert_eq!(USER_AGENTS.len(), 14);
        assert!(USER_AGENTS.iter().any(|ua| ua.contains("Mobile")));
        assert!(USER_AGENTS.iter().any(|ua| ua.contains("Windows NT")));
    }
}
