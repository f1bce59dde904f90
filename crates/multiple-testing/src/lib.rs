//! Multiple-testing correction for pairwise screens
//!
//! Benjamini-Hochberg FDR correction with a Bonferroni reference column, the
//! direction post-filter used to separate true synthetic-lethal candidates from
//! opposite-sign hits, and the Welch-test screen that feeds them.

pub mod correction;
pub mod direction;
pub mod screen;
pub mod welch;

pub use correction::{
    benjamini_hochberg, bonferroni, correct, CorrectedTest, CorrectionReport, DEFAULT_ALPHA,
};
pub use direction::{split_by_direction, DirectionalSplit};
pub use screen::{run_screen, DependencyComparison, ScreenConfig, ScreenResult, SkippedComparison};
pub use welch::{welch_t_test, WelchTest};
