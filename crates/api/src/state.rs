use std::sync::Arc;

use sitepress_core::EventBus;
use sitepress_publish::{GitHubStore, Publisher};

use crate::config::AppConfig;
use crate::notify::TelegramNotifier;

/// Shared application state, passed to all handlers via Axum's `State` extractor.
/// Wrapped in `Arc` so cloning is cheap.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<InnerState>,
}

struct InnerState {
    publisher: Publisher,
    /// Only set for the GitHub backend; used by the status probe.
    github: Option<GitHubStore>,
    notifier: Option<TelegramNotifier>,
    event_bus: EventBus,
    config: AppConfig,
}

impl AppState {
    pub fn new(
        publisher: Publisher,
        github: Option<GitHubStore>,
        notifier: Option<TelegramNotifier>,
        event_bus: EventBus,
        config: AppConfig,
    ) -> Self {
        Self {
            inner: Arc::new(InnerState {
                publisher,
                github,
                notifier,
                event_bus,
                config,
            }),
        }
    }

    pub fn publisher(&self) -> &Publisher {
        &self.inner.publisher
    }

    pub fn github(&self) -> Option<&GitHubStore> {
        self.inner.github.as_ref()
    }

    pub fn notifier(&self) -> Option<&TelegramNotifier> {
        self.inner.notifier.as_ref()
    }

    pub fn event_bus(&self) -> &EventBus {
        &self.inner.event_bus
    }

    pub fn config(&self) -> &AppConfig {
        &self.inner.config
    }
}
