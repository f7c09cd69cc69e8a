//! Cursor implementations for concrete tree representations.

pub mod xml;
