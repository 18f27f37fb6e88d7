#![allow(clippy::collapsible_if)]
#![allow(clippy::collapsible_else_if)]
#![allow(clippy::too_many_arguments)]

// Core modules
pub mod annotations;
pub mod config;
pub mod data;
pub mod domain;
pub mod engine;
pub mod indicators;
pub mod live;
pub mod render;
pub mod utils;

// Re-export the types a host UI touches on every frame
pub use crate::annotations::{AnnotationStore, ToolController, ToolMode};
pub use crate::domain::{Candle, ChartPoint, Drawing, Instrument, Timeframe};
pub use crate::engine::ChartEngine;
pub use crate::indicators::{IndicatorKind, IndicatorParams};
pub use crate::live::{ChannelKind, ConnectionState};
pub use crate::render::{MemorySurface, RenderSurface};
