//! End-of-request hooks
//!
//! A `RequestLifecycle` is created by the server for every request. Code
//! running during the request can register hooks that execute once the
//! response has been produced, along with the files uploaded during the
//! request.

use std::path::PathBuf;

/// A file written to disk while decoding a multipart body
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedFile {
    /// Form field the file was submitted under
    pub field: String,
    /// Filename supplied by the client
    pub original_name: String,
    /// Where the parser stored the file
    pub temp_path: PathBuf,
    /// Size in bytes
    pub size: u64,
    /// Content-Type declared for the part, if any
    pub content_type: Option<String>,
}

type FinishHook = Box<dyn FnOnce(&[UploadedFile]) + Send>;

/// Per-request registry of end-of-request hooks and uploaded files
///
/// Hooks run in ascending priority order when the lifecycle is finished, or
/// dropped if `finish` was never called. Each hook runs exactly once.
///
/// # Example
///
/// ```rust
/// use kit_negotiation::http::RequestLifecycle;
///
/// let mut lifecycle = RequestLifecycle::new();
/// lifecycle.on_finish(10, |uploads| assert!(uploads.is_empty()));
/// lifecycle.finish();
/// ```
#[derive(Default)]
pub struct RequestLifecycle {
    hooks: Vec<(i32, FinishHook)>,
    uploads: Vec<UploadedFile>,
}

impl RequestLifecycle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a hook to run at the end of the request
    ///
    /// Higher priorities run later. Hooks with equal priority run in
    /// registration order.
    pub fn on_finish<F>(&mut self, priority: i32, hook: F)
    where
        F: FnOnce(&[UploadedFile]) + Send + 'static,
    {
        self.hooks.push((priority, Box::new(hook)));
    }

    /// Record files uploaded during this request
    pub fn record_uploads(&mut self, files: impl IntoIterator<Item = UploadedFile>) {
        self.uploads.extend(files);
    }

    /// Files uploaded during this request
    pub fn uploads(&self) -> &[UploadedFile] {
        &self.uploads
    }

    /// Number of hooks that have not run yet
    pub fn pending_hooks(&self) -> usize {
        self.hooks.len()
    }

    /// Run all registered hooks
    pub fn finish(mut self) {
        self.run_hooks();
    }

    fn run_hooks(&mut self) {
        let mut hooks = std::mem::take(&mut self.hooks);
        hooks.sort_by_key(|(priority, _)| *priority);
        for (_, hook) in hooks {
            hook(&self.uploads);
        }
    }
}

impl Drop for RequestLifecycle {
    fn drop(&mut self) {
        self.run_hooks();
    }
}

impl std::fmt::Debug for RequestLifecycle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestLifecycle")
            .field("hooks", &self.hooks.len())
            .field("uploads", &self.uploads)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    fn upload(name: &str) -> UploadedFile {
        UploadedFile {
            field: name.to_string(),
            original_name: format!("{}.txt", name),
            temp_path: PathBuf::from(format!("/tmp/{}", name)),
            size: 3,
            content_type: None,
        }
    }

    #[test]
    fn test_hooks_run_in_priority_order() {
        let order = Arc::new(Mutex::new(Vec::new()));
        let mut lifecycle = RequestLifecycle::new();

        for (priority, label) in [(1000, "cleanup"), (0, "first"), (0, "second"), (-5, "early")] {
            let order = order.clone();
            lifecycle.on_finish(priority, move |_| order.lock().unwrap().push(label));
        }
        assert_eq!(lifecycle.pending_hooks(), 4);

        lifecycle.finish();
        assert_eq!(
            *order.lock().unwrap(),
            vec!["early", "first", "second", "cleanup"]
        );
    }

    #[test]
    fn test_hooks_receive_recorded_uploads() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut lifecycle = RequestLifecycle::new();
        lifecycle.record_uploads(vec![upload("avatar")]);
        lifecycle.record_uploads(vec![upload("resume")]);

        let sink = seen.clone();
        lifecycle.on_finish(0, move |uploads| {
            sink.lock()
                .unwrap()
                .extend(uploads.iter().map(|u| u.field.clone()))
        });
        lifecycle.finish();

        assert_eq!(*seen.lock().unwrap(), vec!["avatar", "resume"]);
    }

    #[test]
    fn test_dropping_runs_hooks_once() {
        let calls = Arc::new(Mutex::new(0));
        {
            let mut lifecycle = RequestLifecycle::new();
            let calls = calls.clone();
            lifecycle.on_finish(0, move |_| *calls.lock().unwrap() += 1);
        }
        assert_eq!(*calls.lock().unwrap(), 1);

        let mut lifecycle = RequestLifecycle::new();
        let counter = calls.clone();
        lifecycle.on_finish(0, move |_| *counter.lock().unwrap() += 1);
        lifecycle.finish();
        assert_eq!(*calls.lock().unwrap(), 2);
    }
}
