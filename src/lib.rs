pub mod adaptation;
pub mod config;
pub mod logging;
pub mod style;

pub use adaptation::{adapt, adapt_record, AdaptationDirective, AdaptedContent, ComplexityLevel, StyleFlag};
pub use style::{
    AgeBand, ClassificationError, ClassificationResult, ClassificationStore,
    LearnerClassificationRecord, SessionController, StyleCategory,
};
