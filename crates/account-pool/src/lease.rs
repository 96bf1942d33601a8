//! The transient ticket granting exclusive use of one account.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::models::{AccountCredentials, Proxy};

/// A lease on one account, returned by [`crate::AccountPool::acquire`].
///
/// Exactly one of `release`, `cooldown`, or `quarantine` should close it;
/// calling more than one of them (or the same one twice) is tolerated as a
/// no-op thanks to the internal `released` flag.
#[derive(Debug)]
pub struct Lease {
    pub account: AccountCredentials,
    pub proxy: Option<Proxy>,
    released: Arc<AtomicBool>,
}

impl Lease {
    /// Construct a lease directly. Normal callers get one from
    /// [`crate::AccountPool::acquire`]; this is exposed so collaborator
    /// implementations outside this crate can build fixtures for their own
    /// tests.
    pub fn new(account: AccountCredentials, proxy: Option<Proxy>) -> Self {
        Self {
            account,
            proxy,
            released: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn account_id(&self) -> &str {
        &self.account.account_id
    }

    /// Mark the lease closed. Returns `true` the first time it is called
    /// for this lease, `false` on every subsequent call (double-close is a
    /// no-op, not an error).
    pub(crate) fn close(&self) -> bool {
        self.released
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }
}
