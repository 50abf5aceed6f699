use indicatif::{ProgressBar, ProgressStyle};
use std::io::IsTerminal;
use std::time::Duration;

/// Transient spinner on stderr while a network call is running.
/// Hidden when stderr is not a terminal or output must stay machine readable.
pub struct Spinner {
    bar: ProgressBar,
}

impl Spinner {
    pub fn start(message: impl Into<String>, visible: bool) -> Self {
        if !visible || !std::io::stderr().is_terminal() {
            return Self {
                bar: ProgressBar::hidden(),
            };
        }

        let bar = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner());
        bar.set_style(style);
        bar.set_message(message.into());
        bar.enable_steady_tick(Duration::from_millis(100));
        Self { bar }
    }

    pub fn set_message(&self, message: impl Into<String>) {
        self.bar.set_message(message.into());
    }

    pub fn finish(self) {
        self.bar.finish_and_clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hidden_spinner_is_inert() {
        let spinner = Spinner::start("loading", false);
        assert!(spinner.bar.is_hidden());
        spinner.set_message("still loading");
        spinner.finish();
    }
}
