//! keymod builds signed Android keyboard-layout APKs.
//!
//! A KCM keymap resource is patched with user key mappings, spliced into a
//! prebuilt unsigned APK template and the result is signed with the legacy
//! JAR/APK v1 scheme accepted by the Android package installer.

pub mod core;
pub mod server;
