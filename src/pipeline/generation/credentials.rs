use std::sync::atomic::{AtomicUsize, Ordering};

/// Ordered provider credentials plus the index of the one to try first.
///
/// The cursor only moves on quota/rate-limit failure, so a working
/// credential stays selected across calls.
pub struct CredentialPool {
    credentials: Vec<String>,
    cursor: AtomicUsize,
}

impl CredentialPool {
    /// Blank tokens are dropped.
    pub fn new(credentials: Vec<String>) -> Self {
        Self {
            credentials: credentials
                .into_iter()
                .map(|c| c.trim().to_string())
                .filter(|c| !c.is_empty())
                .collect(),
            cursor: AtomicUsize::new(0),
        }
    }

    pub fn len(&self) -> usize {
        self.credentials.len()
    }

    pub fn is_empty(&self) -> bool {
        self.credentials.is_empty()
    }

    pub fn cursor(&self) -> usize {
        self.cursor.load(Ordering::Acquire)
    }

    pub fn credential(&self, index: usize) -> Option<&str> {
        self.credentials.get(index).map(String::as_str)
    }

    /// Move the cursor past `from` and return the index to try next.
    ///
    /// If another caller already rotated away from `from`, their position
    /// wins and is returned unchanged.
    pub fn rotate_from(&self, from: usize) -> usize {
        if self.credentials.is_empty() {
            return 0;
        }
        let next = (from + 1) % self.credentials.len();
        match self
            .cursor
            .compare_exchange(from, next, Ordering::AcqRel, Ordering::Acquire)
        {
            Ok(_) => next,
            Err(current) => current,
        }
    }
}

impl std::fmt::Debug for CredentialPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialPool")
            .field("len", &self.credentials.len())
            .field("cursor", &self.cursor())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pool(n: usize) -> CredentialPool {
        CredentialPool::new((0..n).map(|i| format!("key-{i}")).collect())
    }

    #[test]
    fn blank_credentials_are_dropped() {
        let pool = CredentialPool::new(vec!["a".into(), "  ".into(), "".into(), "b".into()]);
        assert_eq!(pool.len(), 2);
        assert_eq!(pool.credential(1), Some("b"));
    }

    #[test]
    fn rotation_wraps_around() {
        let pool = pool(3);
        assert_eq!(pool.rotate_from(0), 1);
        assert_eq!(pool.rotate_from(1), 2);
        assert_eq!(pool.rotate_from(2), 0);
        assert_eq!(pool.cursor(), 0);
    }

    #[test]
    fn stale_rotation_does_not_double_advance() {
        let pool = pool(3);
        assert_eq!(pool.rotate_from(0), 1);
        // A second caller that also started at 0 sees the first caller's move.
        assert_eq!(pool.rotate_from(0), 1);
        assert_eq!(pool.cursor(), 1);
    }

    #[test]
    fn concurrent_rotations_leave_a_valid_cursor() {
        let pool = std::sync::Arc::new(pool(4));
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let pool = pool.clone();
                std::thread::spawn(move || {
                    for _ in 0..100 {
                        let at = pool.cursor();
                        pool.rotate_from(at);
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert!(pool.cursor() < 4);
    }

    #[test]
    fn debug_output_hides_tokens() {
        let pool = CredentialPool::new(vec!["secret-token".into()]);
        let shown = format!("{pool:?}");
        assert!(!shown.contains("secret-token"));
        assert!(shown.contains("len: 1"));
    }

    #[test]
    fn empty_pool_rotation_is_noop() {
        let pool = CredentialPool::new(vec![]);
        assert!(pool.is_empty());
        assert_eq!(pool.rotate_from(0), 0);
    }
}
