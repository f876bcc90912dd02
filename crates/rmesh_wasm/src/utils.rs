/// Routes Rust panics through `console.error` instead of a silent abort,
/// so failures are visible in the browser console during development.
pub fn set_panic_hook() {
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();
}
