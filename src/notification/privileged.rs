//! Privileged execution hook
//!
//! Outbound network and credential operations run inside a privilege scope
//! supplied by the embedding host. The scope is held by a guard for as long
//! as the operation runs.

use std::future::Future;

/// Guard that keeps a privilege scope open until dropped.
pub type PrivilegeGuard = Box<dyn Send>;

pub trait PrivilegedExecution: Send + Sync {
    /// Enter the privileged scope for the named action.
    fn enter(&self, action: &'static str) -> PrivilegeGuard;
}

/// Runs everything as a plain call.
#[derive(Debug, Clone, Copy, Default)]
pub struct DirectExecution;

impl PrivilegedExecution for DirectExecution {
    fn enter(&self, _action: &'static str) -> PrivilegeGuard {
        Box::new(())
    }
}

/// Await `fut` while the privilege scope for `action` is held.
pub async fn run_privileged<F, T>(executor: &dyn PrivilegedExecution, action: &'static str, fut: F) -> T
where
    F: Future<Output = T>,
{
    let _guard = executor.enter(action);
    fut.await
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    /// Records entered actions and how many scopes are currently open.
    #[derive(Default)]
    pub struct RecordingExecution {
        pub actions: Mutex<Vec<&'static str>>,
        pub open: Arc<AtomicUsize>,
    }

    struct OpenScope(Arc<AtomicUsize>);

    impl Drop for OpenScope {
        fn drop(&mut self) {
            self.0.fetch_sub(1, Ordering::SeqCst);
        }
    }

    impl PrivilegedExecution for RecordingExecution {
        fn enter(&self, action: &'static str) -> PrivilegeGuard {
            self.actions.lock().unwrap().push(action);
            self.open.fetch_add(1, Ordering::SeqCst);
            Box::new(OpenScope(self.open.clone()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::RecordingExecution;
    use super::*;
    use std::sync::atomic::Ordering;

    #[tokio::test]
    async fn test_scope_held_for_duration_of_future() {
        let executor = RecordingExecution::default();
        let open = executor.open.clone();

        let seen = run_privileged(&executor, "send_message", async move { open.load(Ordering::SeqCst) }).await;

        assert_eq!(seen, 1);
        assert_eq!(executor.open.load(Ordering::SeqCst), 0);
        assert_eq!(*executor.actions.lock().unwrap(), vec!["send_message"]);
    }
}
