//! Book export.
//!
//! | Module | Role |
//! |--------|------|
//! | [`layout`] | Pure page geometry and word wrapping |
//! | [`pdf`] | `lopdf` document assembly and image embedding |

pub mod layout;
pub mod pdf;

pub use pdf::{ExportError, export_book};
