//! Per-trigger mutual exclusion for retrievals.
//!
//! A trigger is one control a user can fire, e.g. the "Password" button of one vault block. While
//! a retrieval started from it is in flight the trigger is disabled, and it is re-enabled exactly
//! once when the [`TriggerGuard`] is dropped. Dropping covers success, failure, timeout, an
//! unwinding panic and a cancelled task alike.
//!
//! Exclusion is per trigger only. Two different triggers can run at the same time.

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use tracing::trace;

use crate::Property;

/// A single retrieval control.
#[derive(Debug)]
pub struct RetrievalTrigger {
    label: String,
    in_flight: AtomicBool,
}

impl RetrievalTrigger {
    #[allow(missing_docs)]
    pub fn new(label: impl Into<String>) -> Arc<Self> {
        Arc::new(Self {
            label: label.into(),
            in_flight: AtomicBool::new(false),
        })
    }

    #[allow(missing_docs)]
    pub fn label(&self) -> &str {
        &self.label
    }

    /// `false` while a retrieval from this trigger is outstanding.
    pub fn is_enabled(&self) -> bool {
        !self.in_flight.load(Ordering::Acquire)
    }

    /// Disable the trigger for the lifetime of the returned guard.
    ///
    /// Returns `None` when the trigger is already disabled; the caller should ignore the request.
    pub fn try_begin(self: &Arc<Self>) -> Option<TriggerGuard> {
        self.in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()?;
        trace!(trigger = %self.label, "Trigger disabled");
        Some(TriggerGuard {
            trigger: Arc::clone(self),
        })
    }
}

/// Keeps a [`RetrievalTrigger`] disabled until dropped.
#[derive(Debug)]
#[must_use = "the trigger is re-enabled as soon as the guard is dropped"]
pub struct TriggerGuard {
    trigger: Arc<RetrievalTrigger>,
}

impl TriggerGuard {
    #[allow(missing_docs)]
    pub fn trigger(&self) -> &RetrievalTrigger {
        &self.trigger
    }
}

impl Drop for TriggerGuard {
    fn drop(&mut self) {
        self.trigger.in_flight.store(false, Ordering::Release);
        trace!(trigger = %self.trigger.label, "Trigger re-enabled");
    }
}

/// The three triggers rendered for one vault block.
#[derive(Debug, Clone)]
pub struct BlockTriggers {
    username: Arc<RetrievalTrigger>,
    password: Arc<RetrievalTrigger>,
    totp: Arc<RetrievalTrigger>,
}

impl BlockTriggers {
    /// Triggers labelled `<prefix> / <property>`.
    pub fn new(prefix: &str) -> Self {
        let make = |property: Property| {
            RetrievalTrigger::new(format!("{prefix} / {}", property.label()))
        };
        Self {
            username: make(Property::Username),
            password: make(Property::Password),
            totp: make(Property::Totp),
        }
    }

    #[allow(missing_docs)]
    pub fn get(&self, property: Property) -> &Arc<RetrievalTrigger> {
        match property {
            Property::Username => &self.username,
            Property::Password => &self.password,
            Property::Totp => &self.totp,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_begin_is_refused_while_in_flight() {
        let trigger = RetrievalTrigger::new("example.com / Password");
        let guard = trigger.try_begin().expect("first begin");
        assert!(!trigger.is_enabled());
        assert!(trigger.try_begin().is_none());

        drop(guard);
        assert!(trigger.is_enabled());
        assert!(trigger.try_begin().is_some());
    }

    #[test]
    fn refused_begin_does_not_re_enable() {
        let trigger = RetrievalTrigger::new("t");
        let _guard = trigger.try_begin().unwrap();
        assert!(trigger.try_begin().is_none());
        assert!(!trigger.is_enabled());
    }

    #[test]
    fn re_enabled_after_panic() {
        let trigger = RetrievalTrigger::new("t");
        let cloned = Arc::clone(&trigger);
        let result = std::panic::catch_unwind(move || {
            let _guard = cloned.try_begin().unwrap();
            panic!("fetch blew up");
        });
        assert!(result.is_err());
        assert!(trigger.is_enabled());
    }

    #[test]
    fn triggers_are_independent() {
        let triggers = BlockTriggers::new("example.com");
        let _password = triggers.get(Property::Password).try_begin().unwrap();
        let _username = triggers.get(Property::Username).try_begin().unwrap();
        assert!(triggers.get(Property::Totp).is_enabled());
        assert_eq!(triggers.get(Property::Totp).label(), "example.com / TOTP");
    }

    #[tokio::test]
    async fn re_enabled_when_task_is_aborted() {
        let trigger = RetrievalTrigger::new("t");
        let guard = trigger.try_begin().unwrap();
        let task = tokio::spawn(async move {
            let _guard = guard;
            std::future::pending::<()>().await;
        });
        tokio::task::yield_now().await;
        assert!(!trigger.is_enabled());

        task.abort();
        let _ = task.await;
        assert!(trigger.is_enabled());
    }
}
