//! Per-format extractors producing uniform [`crate::types::PageRecord`]s.
//!
//! * [`docx`] — Word documents, one record per file, page 0.
//! * [`pdf`] — PDFs, one record per physical page.
//! * [`web`] — fetched URLs, one record per page with title/description/language.

pub mod docx;
pub mod pdf;
pub mod web;

pub use docx::load_docx;
pub use pdf::load_pdf;
pub use web::load_web;
