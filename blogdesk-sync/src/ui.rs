//! The view-layer seam of an edit session.

use async_trait::async_trait;

/// What an edit session needs from whoever renders it.
#[async_trait]
pub trait EditorUi: Send + Sync {
    /// Shows a dismissible error dialog.
    async fn show_error(&self, message: &str);

    /// Asks the user to confirm; returns false if they decline.
    async fn confirm(&self, message: &str) -> bool;

    /// Returns to the previous view.
    async fn navigate_back(&self);
}

/// A UI double that records every interaction.
pub mod mock {
    use super::*;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    #[derive(Debug)]
    pub struct RecordingUi {
        errors: Mutex<Vec<String>>,
        confirmations: Mutex<Vec<String>>,
        confirm_answer: AtomicBool,
        back_count: AtomicUsize,
    }

    impl Default for RecordingUi {
        fn default() -> Self {
            Self {
                errors: Mutex::new(Vec::new()),
                confirmations: Mutex::new(Vec::new()),
                confirm_answer: AtomicBool::new(true),
                back_count: AtomicUsize::new(0),
            }
        }
    }

    impl RecordingUi {
        pub fn new() -> Self {
            Self::default()
        }

        /// Sets what `confirm` answers from now on.
        pub fn answer_confirm(&self, answer: bool) {
            self.confirm_answer.store(answer, Ordering::SeqCst);
        }

        pub fn errors(&self) -> Vec<String> {
            self.errors.lock().unwrap().clone()
        }

        pub fn confirmations(&self) -> Vec<String> {
            self.confirmations.lock().unwrap().clone()
        }

        pub fn back_count(&self) -> usize {
            self.back_count.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl EditorUi for RecordingUi {
        async fn show_error(&self, message: &str) {
            self.errors.lock().unwrap().push(message.to_string());
        }

        async fn confirm(&self, message: &str) -> bool {
            self.confirmations.lock().unwrap().push(message.to_string());
            self.confirm_answer.load(Ordering::SeqCst)
        }

        async fn navigate_back(&self) {
            self.back_count.fetch_add(1, Ordering::SeqCst);
        }
    }
}
