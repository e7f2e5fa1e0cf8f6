use std::sync::Arc;

use croco_core::YandexSpeller;
use croco_store::Store;

/// Shared application state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub store: Store,
    pub speller: Arc<YandexSpeller>,
}
