//! Client-side session state.
//!
//! SYSTEM CONTEXT
//! ==============
//! `session` owns the current credential and its durable copy, `storage`
//! abstracts the durable backend, and `guard` derives route access from the
//! session without side effects.

pub mod credential;
pub mod guard;
pub mod session;
pub mod storage;
