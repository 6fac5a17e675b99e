//! Behaviour of the public site's client script, kept here so the server and its
//! tests share one definition.

pub mod i18n;
pub mod nav;
pub mod session_gate;
