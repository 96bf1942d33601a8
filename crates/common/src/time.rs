//! Epoch-seconds helpers shared by every durable store.

use std::time::{SystemTime, UNIX_EPOCH};

/// Current unix time in whole seconds.
pub fn now_secs() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system clock before unix epoch")
        .as_secs() as i64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn now_secs_is_plausible() {
        let t = now_secs();
        assert!(t > 1_700_000_000, "now_secs returned implausible past time");
    }
}
