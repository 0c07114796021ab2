use crate::error;
use std::{panic, process, thread};

/// Configures the panic hook to log and exit the program on every panic.
///
/// Note that the hook runs before unwinding, so panics inside pool computations exit too
/// instead of surfacing as [`crate::task::TaskError::Panicked`].
pub fn configure_panic() {
    let default_hook = panic::take_hook();
    panic::set_hook(Box::new(move |panic_info| {
        let (file, line, column) = match panic_info.location() {
            Some(location) => (location.file(), location.line(), location.column()),
            None => ("unknown", 0, 0),
        };
        let message = crate::task::panic_message(panic_info.payload());
        let current_thread = thread::current();
        let thread_name = current_thread.name().unwrap_or("<unnamed>");
        error!("thread '{}' panicked at {}:{}:{}: {}", thread_name, file, line, column, message);
        // The default hook may print the full backtrace
        default_hook(panic_info);
        println!("Exiting...");
        process::exit(1);
    }));
}
