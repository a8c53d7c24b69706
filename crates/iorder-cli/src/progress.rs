//! Progress bars for validation phases.

use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use iorder_pm::{ProgressData, ProgressReceiver};

/// Shows one progress bar per validation phase
pub struct ProgressManager {
    multi: MultiProgress,
    enabled: bool,
    current: Option<(String, ProgressBar)>,
}

impl ProgressManager {
    pub fn new(enabled: bool) -> Self {
        Self {
            multi: MultiProgress::new(),
            enabled,
            current: None,
        }
    }

    /// Create a bar for a phase with `total` elements
    fn create_phase_bar(&self, phase: &str, total: u64) -> ProgressBar {
        if !self.enabled {
            return ProgressBar::hidden();
        }

        let pb = self.multi.add(ProgressBar::new(total));
        let style = ProgressStyle::default_bar()
            .template("{prefix:>8.cyan.bold} [{bar:40.cyan/blue}] {pos}/{len}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-");
        pb.set_style(style);
        pb.set_prefix(phase.to_string());
        pb
    }

    /// Finish whatever bar is still open
    pub fn finish(&mut self) {
        if let Some((_, bar)) = self.current.take() {
            bar.finish();
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }
}

impl ProgressReceiver for ProgressManager {
    fn receive(&mut self, data: &ProgressData) -> bool {
        let same_phase = matches!(&self.current, Some((name, _)) if name == data.name());
        if !same_phase {
            self.finish();
            let bar = self.create_phase_bar(data.name(), data.max());
            self.current = Some((data.name().to_string(), bar));
        }

        if let Some((_, bar)) = &self.current {
            bar.set_position(data.value());
            if data.value() >= data.max() {
                bar.finish();
            }
        }
        true
    }
}

impl Drop for ProgressManager {
    fn drop(&mut self) {
        self.finish();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use iorder_pm::ProgressCounter;

    #[test]
    fn test_progress_manager_disabled() {
        let pm = ProgressManager::new(false);
        assert!(!pm.is_enabled());
    }

    #[test]
    fn test_switches_bar_per_phase() {
        let mut pm = ProgressManager::new(false);

        let mut delete = ProgressCounter::new("DELETE", 2).send_to(&mut pm);
        assert!(delete.to_min());
        assert!(delete.incr());
        drop(delete);
        assert_eq!(pm.current.as_ref().map(|(name, _)| name.as_str()), Some("DELETE"));

        let mut install = ProgressCounter::new("INSTALL", 1).send_to(&mut pm);
        assert!(install.to_min());
        drop(install);
        let (name, bar) = pm.current.as_ref().unwrap();
        assert_eq!(name, "INSTALL");
        assert_eq!(bar.position(), 0);
    }
}
