pub mod annotator;
pub mod correction;
pub mod error;
pub mod ledger;
pub mod model;
pub mod originator;
pub mod overlay;
pub mod store;

pub use annotator::Annotator;
pub use error::RevisionsError;
pub use model::{Annotation, Body, Layer, Target, User};
pub use overlay::{CorrectionQuery, RevisionsOverlay};
pub use store::{AnnotationRef, AnnotationStore, Filter, Filterable, MemoryStore, Origin, StoreChange};
