//! Built-in ops definitions per operating system.

pub mod iosxe;
pub mod nxos;
