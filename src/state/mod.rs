/// State management module
///
/// This module handles all culling state, including:
/// - Shared data structures (data.rs)
/// - The persisted session document (session.rs)
/// - The action/session store, sole owner of pairs and history (store.rs)

pub mod data;
pub mod session;
pub mod store;
