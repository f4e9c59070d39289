use std::sync::Mutex;

use crate::notice::{Notice, NoticeLevel, Notifier};

/// A notifier for testing that records every notice it receives.
#[derive(Default)]
pub struct RecordingNotifier {
    notices: Mutex<Vec<Notice>>,
}

impl RecordingNotifier {
    /// Construct an empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// All notices received so far, oldest first.
    pub fn notices(&self) -> Vec<Notice> {
        self.notices.lock().expect("notices mutex poisoned").clone()
    }

    /// Notices of the given level.
    pub fn notices_of(&self, level: NoticeLevel) -> Vec<Notice> {
        self.notices()
            .into_iter()
            .filter(|notice| notice.level == level)
            .collect()
    }

    /// Forget all recorded notices.
    pub fn reset(&self) {
        self.notices.lock().expect("notices mutex poisoned").clear();
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, notice: Notice) {
        self.notices
            .lock()
            .expect("notices mutex poisoned")
            .push(notice);
    }
}
