mod notifier;

pub use notifier::RecordingNotifier;
