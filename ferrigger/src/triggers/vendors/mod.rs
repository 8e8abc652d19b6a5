//! Built-in triggers per operating system.

pub mod iosxe;
