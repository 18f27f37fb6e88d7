mod painter;
mod store;
mod tools;

pub use painter::AnnotationPainter;
pub use store::AnnotationStore;
pub use tools::{ToolController, ToolMode};
