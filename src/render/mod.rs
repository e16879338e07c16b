//! The two rendering backends that turn an [`crate::core::result::AnalysisResult`]
//! into the deterministic text streams spec section 4.6/4.7 describe.

pub mod asm;
pub mod pseudo;

pub use asm::render_asm;
pub use pseudo::render_pseudocode;
