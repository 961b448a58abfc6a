//! The panic hook is process-global, so it gets a test binary of its own.

use std::sync::Arc;
use std::thread;

use sigwire_engine::{ErrorReporter, RecordingSink, install_panic_hook};

#[test]
fn panics_on_any_thread_are_reported_and_swallowed() {
    let sink = Arc::new(RecordingSink::default());
    let reporter = Arc::new(ErrorReporter::new(Arc::clone(&sink)));
    install_panic_hook(Arc::clone(&reporter));

    let same_thread = std::panic::catch_unwind(|| panic!("kaboom"));
    let worker = thread::spawn(|| panic!("worker down")).join();
    let _ = std::panic::take_hook();

    assert!(same_thread.is_err());
    assert!(worker.is_err());
    assert_eq!(reporter.reported(), 2);

    let messages = sink.messages();
    assert!(messages[0].starts_with("panicked at"));
    assert!(messages[0].ends_with("kaboom"));
    assert!(messages[1].ends_with("worker down"));
}
