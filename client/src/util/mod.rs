//! Utility helpers shared by the view layer.
//!
//! SYSTEM CONTEXT
//! ==============
//! Utility modules isolate view-layer glue from session and request logic so
//! every composing application reacts to session changes the same way.

pub mod redirect;
