// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! User-visible notification channel (toasts).

use serde::Serialize;
use std::sync::Mutex;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ToastVariant {
    #[default]
    Default,
    Destructive,
}

/// Transient notification shown to the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Toast {
    pub title: String,
    pub description: String,
    pub variant: ToastVariant,
}

impl Toast {
    pub fn success(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            variant: ToastVariant::Default,
        }
    }

    pub fn failure(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            variant: ToastVariant::Destructive,
        }
    }
}

/// Sink for toasts. Implementations must not block.
pub trait Notifier: Send + Sync {
    fn notify(&self, toast: Toast);
}

/// Notifier that writes toasts to the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, toast: Toast) {
        match toast.variant {
            ToastVariant::Default => {
                tracing::info!(title = %toast.title, description = %toast.description, "Toast")
            }
            ToastVariant::Destructive => {
                tracing::warn!(title = %toast.title, description = %toast.description, "Toast")
            }
        }
    }
}

/// Notifier that keeps every toast in memory.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    toasts: Mutex<Vec<Toast>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn toasts(&self) -> Vec<Toast> {
        self.toasts.lock().map(|t| t.clone()).unwrap_or_default()
    }

    pub fn last(&self) -> Option<Toast> {
        self.toasts().pop()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, toast: Toast) {
        if let Ok(mut toasts) = self.toasts.lock() {
            toasts.push(toast);
        }
    }
}
