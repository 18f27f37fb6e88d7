mod loader;
mod provider;

pub use {
    loader::HistoryLoader,
    provider::{HistoryProvider, RestHistoryProvider},
};
