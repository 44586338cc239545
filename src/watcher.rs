use crate::display::{display_activity_report_table, print_info, print_warning};
use anyhow::Result;
use cachelytics::controller::DashboardController;
use cachelytics::source::ExportFileSource;
use chrono::Local;
use notify::{Config, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::Path;
use std::sync::mpsc;
use std::time::Duration;
use tracing::{debug, warn};

/// Re-renders the activity table whenever the captured data changes
pub struct ActivityWatcher {
    controller: DashboardController<ExportFileSource>,
    watcher: RecommendedWatcher,
    receiver: mpsc::Receiver<notify::Result<notify::Event>>,
    interval: Duration,
}

impl ActivityWatcher {
    pub fn new(
        controller: DashboardController<ExportFileSource>,
        interval: Duration,
    ) -> Result<Self> {
        let (sender, receiver) = mpsc::channel();

        let watcher = RecommendedWatcher::new(
            move |res| {
                if let Err(e) = sender.send(res) {
                    warn!(error = %e, "watch channel closed");
                }
            },
            Config::default(),
        )?;

        Ok(Self {
            controller,
            watcher,
            receiver,
            interval,
        })
    }

    pub fn watch(&mut self, data_path: &Path) -> Result<()> {
        print_info("🔍 Starting watch mode...");
        print_info(&format!("👀 Monitoring: {}", data_path.display()));
        print_info("Press Ctrl+C to stop");

        self.watcher.watch(data_path, RecursiveMode::Recursive)?;

        self.refresh_and_display();

        loop {
            match self.receiver.recv_timeout(self.interval) {
                Ok(Ok(event)) => {
                    if is_relevant_event(&event) {
                        debug!(paths = ?event.paths, "capture changed");
                        print_info(&format!("📄 File changed: {:?}", event.paths));
                        self.refresh_and_display();
                    }
                }
                Ok(Err(e)) => {
                    warn!(error = %e, "watch error");
                }
                Err(mpsc::RecvTimeoutError::Timeout) => {
                    self.refresh_and_display();
                }
                Err(e) => {
                    warn!(error = %e, "watch receiver disconnected");
                    break;
                }
            }
        }

        Ok(())
    }

    /// A failed refetch keeps the previous rows on screen
    fn refresh_and_display(&mut self) {
        let timestamp = Local::now().format("%Y-%m-%d %H:%M:%S");
        println!("\n🕐 Last updated: {}", timestamp);
        println!("{}", "─".repeat(80));

        if let Err(e) = self.controller.refresh() {
            print_warning(&format!("Refetch failed: {}", e));
        }

        let view = self.controller.view();
        if view.report.series.is_empty() {
            print_info("No cache activity for the current selection");
        } else {
            display_activity_report_table(&view.report);
        }

        println!("{}", "─".repeat(80));
    }
}

fn is_relevant_event(event: &notify::Event) -> bool {
    event.paths.iter().any(|path| {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext == "json" || ext == "jsonl")
            .unwrap_or(false)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::{Event, EventKind};
    use std::path::PathBuf;

    #[test]
    fn test_only_capture_files_are_relevant() {
        let capture = Event::new(EventKind::Any).add_path(PathBuf::from("/data/2024-05-01.json"));
        assert!(is_relevant_event(&capture));

        let jsonl = Event::new(EventKind::Any).add_path(PathBuf::from("/data/rows.jsonl"));
        assert!(is_relevant_event(&jsonl));

        let other = Event::new(EventKind::Any).add_path(PathBuf::from("/data/.swp"));
        assert!(!is_relevant_event(&other));
    }
}
