//! Per-symbol async locks: at most one rights recompute per symbol at a time.

use crate::domain::Symbol;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

#[derive(Debug, Clone, Default)]
pub struct SymbolLocks {
    inner: Arc<Mutex<HashMap<Symbol, Arc<Mutex<()>>>>>,
}

impl SymbolLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for and hold the lock for `symbol`. Released when the guard drops.
    pub async fn lock(&self, symbol: &Symbol) -> OwnedMutexGuard<()> {
        let lock = {
            let mut map = self.inner.lock().await;
            Arc::clone(map.entry(symbol.clone()).or_default())
        };
        lock.lock_owned().await
    }

    /// Lock for `symbol` if nobody holds it.
    pub async fn try_lock(&self, symbol: &Symbol) -> Option<OwnedMutexGuard<()>> {
        let lock = {
            let mut map = self.inner.lock().await;
            Arc::clone(map.entry(symbol.clone()).or_default())
        };
        lock.try_lock_owned().ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_same_symbol_is_exclusive() {
        let locks = SymbolLocks::new();
        let symbol = Symbol::new("2330");
        let guard = locks.lock(&symbol).await;
        assert!(locks.try_lock(&symbol).await.is_none());
        drop(guard);
        assert!(locks.try_lock(&symbol).await.is_some());
    }

    #[tokio::test]
    async fn test_different_symbols_are_independent() {
        let locks = SymbolLocks::new();
        let _a = locks.lock(&Symbol::new("2330")).await;
        assert!(locks.try_lock(&Symbol::new("2317")).await.is_some());
    }

    #[tokio::test]
    async fn test_waiter_proceeds_after_release() {
        let locks = SymbolLocks::new();
        let symbol = Symbol::new("2330");
        let guard = locks.lock(&symbol).await;

        let waiter = {
            let locks = locks.clone();
            let symbol = symbol.clone();
            tokio::spawn(async move {
                let _g = locks.lock(&symbol).await;
                true
            })
        };
        tokio::task::yield_now().await;
        assert!(!waiter.is_finished());
        drop(guard);
        assert!(waiter.await.unwrap());
    }
}
