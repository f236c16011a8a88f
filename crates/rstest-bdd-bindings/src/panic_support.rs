//! Helpers for rendering panic payloads and remembering where panics began.

use std::cell::RefCell;
use std::panic;
use std::sync::Once;

use crate::localization;
use crate::method::SourceLocation;

thread_local! {
    static LAST_PANIC_LOCATION: RefCell<Option<SourceLocation>> = const { RefCell::new(None) };
}

static LOCATION_HOOK: Once = Once::new();

/// Extracts a panic payload into a human-readable message.
///
/// Attempts to downcast common primitives before falling back to an opaque
/// description that includes the payload [`TypeId`](std::any::TypeId).
///
/// # Examples
/// ```
/// use rstest_bdd_bindings::panic_message;
///
/// let err = std::panic::catch_unwind(|| panic!("boom"))
///     .expect_err("expected panic");
/// assert_eq!(panic_message(err.as_ref()), "boom");
/// ```
#[must_use]
pub fn panic_message(e: &(dyn std::any::Any + Send)) -> String {
    macro_rules! try_downcast {
        ($($ty:ty),* $(,)?) => {
            $(
                if let Some(val) = e.downcast_ref::<$ty>() {
                    return val.to_string();
                }
            )*
        };
    }

    try_downcast!(&str, String, i32, u32, i64, u64, isize, usize, f32, f64);
    let ty = format!("erased `Any` payload (TypeId({:?}))", e.type_id());
    localization::message_with_args("panic-message-opaque-payload", |args| {
        args.set("type", ty);
    })
}

/// Install, once per process, a panic hook that records each panic's origin
/// on the panicking thread before delegating to the previously installed hook.
pub(crate) fn install_location_hook() {
    LOCATION_HOOK.call_once(|| {
        let previous = panic::take_hook();
        panic::set_hook(Box::new(move |info| {
            if let Some(location) = info.location() {
                let location = SourceLocation::new(
                    location.file().to_owned(),
                    location.line(),
                    location.column(),
                );
                LAST_PANIC_LOCATION.with(|cell| *cell.borrow_mut() = Some(location));
            }
            previous(info);
        }));
    });
}

/// Remove and return the origin of the most recent panic on this thread.
pub(crate) fn take_last_panic_location() -> Option<SourceLocation> {
    LAST_PANIC_LOCATION.with(|cell| cell.borrow_mut().take())
}
