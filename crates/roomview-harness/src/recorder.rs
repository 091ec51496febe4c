//! Recording dialog presenter and analytics sink.

use roomview_app::{AnalyticsEvent, AnalyticsSink, Dialog, DialogPresenter};

/// [`DialogPresenter`] that keeps every dialog it is asked to show.
#[derive(Debug, Clone, Default)]
pub struct RecordingPresenter {
    dialogs: Vec<Dialog>,
}

impl RecordingPresenter {
    /// Create an empty presenter.
    pub fn new() -> Self {
        Self::default()
    }

    /// Dialogs shown so far, oldest first.
    pub fn dialogs(&self) -> &[Dialog] {
        &self.dialogs
    }

    /// Most recent dialog.
    pub fn last(&self) -> Option<&Dialog> {
        self.dialogs.last()
    }
}

impl DialogPresenter for RecordingPresenter {
    fn show_dialog(&mut self, dialog: Dialog) {
        tracing::debug!(?dialog, "dialog shown");
        self.dialogs.push(dialog);
    }
}

/// [`AnalyticsSink`] that keeps every event it receives.
#[derive(Debug, Clone, Default)]
pub struct RecordingAnalytics {
    events: Vec<AnalyticsEvent>,
}

impl RecordingAnalytics {
    /// Create an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Events tracked so far, oldest first.
    pub fn events(&self) -> &[AnalyticsEvent] {
        &self.events
    }
}

impl AnalyticsSink for RecordingAnalytics {
    fn track(&mut self, event: AnalyticsEvent) {
        self.events.push(event);
    }
}
