use std::any::Any;
use std::backtrace::Backtrace;
use std::cell::{Cell, RefCell};
use std::panic::{self, AssertUnwindSafe, PanicHookInfo};
use std::sync::Once;

use crate::context::handle::{FatalAbort, TestHandle};

/// How a step body left its boundary.
pub(crate) enum Contained<T> {
    Returned(T),
    Panicked { message: String, trace: String },
    /// A [`FatalAbort`] unwind; the payload is kept so it can be resumed.
    Aborted(Box<dyn Any + Send>),
}

/// Where a panic was raised, recorded by the hook before unwinding starts.
struct PanicSite {
    location: String,
    backtrace: Option<String>,
}

impl PanicSite {
    fn into_trace(self) -> String {
        match self.backtrace {
            Some(backtrace) => format!("panicked at {}\n{}", self.location, backtrace),
            None => format!("panicked at {}", self.location),
        }
    }
}

thread_local! {
    /// `Some(capture_backtrace)` while this thread runs inside a step boundary.
    static BOUNDARY: Cell<Option<bool>> = const { Cell::new(None) };
    static LAST_PANIC: RefCell<Option<PanicSite>> = const { RefCell::new(None) };
}

/// Install the recording hook once per process, chaining whatever hook was
/// set before it.
fn install_panic_hook() {
    static HOOK: Once = Once::new();
    HOOK.call_once(|| {
        let previous = panic::take_hook();
        panic::set_hook(Box::new(move |info: &PanicHookInfo<'_>| {
            record_panic_site(info);
            previous(info);
        }));
    });
}

fn record_panic_site(info: &PanicHookInfo<'_>) {
    let Ok(Some(capture_backtrace)) = BOUNDARY.try_with(Cell::get) else {
        return;
    };
    let location = info
        .location()
        .map(|l| format!("{}:{}:{}", l.file(), l.line(), l.column()))
        .unwrap_or_else(|| "<unknown>".to_string());
    let backtrace = capture_backtrace.then(|| Backtrace::force_capture().to_string());
    let _ = LAST_PANIC.try_with(|slot| {
        *slot.borrow_mut() = Some(PanicSite {
            location,
            backtrace,
        });
    });
}

/// Run `f`, converting any unwind into a [`Contained`] value.
///
/// The trace of a caught panic is taken by the panic hook at the panic site,
/// so it names the panicking code rather than this boundary.
pub(crate) fn contain<T>(capture_backtrace: bool, f: impl FnOnce() -> T) -> Contained<T> {
    install_panic_hook();
    let outer = BOUNDARY.replace(Some(capture_backtrace));
    LAST_PANIC.with(|slot| slot.borrow_mut().take());

    let result = panic::catch_unwind(AssertUnwindSafe(f));
    BOUNDARY.set(outer);

    match result {
        Ok(value) => Contained::Returned(value),
        Err(payload) if payload.is::<FatalAbort>() => Contained::Aborted(payload),
        Err(payload) => {
            let trace = LAST_PANIC
                .with(|slot| slot.borrow_mut().take())
                .map(PanicSite::into_trace)
                .unwrap_or_default();
            Contained::Panicked {
                message: panic_message(payload.as_ref()),
                trace,
            }
        }
    }
}

/// Render a panic payload as text.
pub fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "Box<dyn Any>".to_string()
    }
}

/// `"<context> panicked: <message>\n<trace>"`
pub fn panic_diagnostic(context_name: &str, message: &str, trace: &str) -> String {
    format!("{} panicked: {}\n{}", context_name, message, trace)
}

/// Report a contained crash as a top-level error of the test.
pub fn report_test_error(owner: &dyn TestHandle, context_name: &str, message: &str) {
    tracing::error!(context = context_name, "step crashed");
    owner.error(message);
}
