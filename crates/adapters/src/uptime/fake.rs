// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fake uptime adapter for testing
#![cfg_attr(coverage_nightly, coverage(off))]

use super::{UptimeAdapter, UptimeError};
use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::{Arc, Mutex};

/// Fake uptime adapter that records pinged keys
///
/// Every key counts as registered unless `only` restricts the set.
#[derive(Clone, Default)]
pub struct FakeUptimeAdapter {
    pings: Arc<Mutex<Vec<String>>>,
    known: Arc<Mutex<Option<HashSet<String>>>>,
}

impl FakeUptimeAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Restrict registered keys to `keys`
    pub fn only(self, keys: &[&str]) -> Self {
        *self.known.lock().unwrap_or_else(|e| e.into_inner()) =
            Some(keys.iter().map(|k| k.to_string()).collect());
        self
    }

    /// Keys pinged so far, in order
    pub fn pings(&self) -> Vec<String> {
        self.pings.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

#[async_trait]
impl UptimeAdapter for FakeUptimeAdapter {
    async fn ping(&self, key: &str) -> Result<bool, UptimeError> {
        let known = self
            .known
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .as_ref()
            .is_none_or(|keys| keys.contains(key));
        if known {
            self.pings
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .push(key.to_string());
        }
        Ok(known)
    }
}
