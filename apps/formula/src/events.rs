//! Event handling and progress display

use crate::logging::log_event_with_tracing;
use console::{style, Term};
use formula_events::{AppEvent, DownloadEvent, GeneralEvent, PipelineEvent};

/// Renders events on stderr, or as JSON lines on stdout in `--json` mode
pub struct EventHandler {
    term: Term,
    colors_enabled: bool,
    json: bool,
    debug_enabled: bool,
}

impl EventHandler {
    pub fn new(colors_enabled: bool, json: bool, debug_enabled: bool) -> Self {
        Self {
            term: Term::stderr(),
            colors_enabled,
            json,
            debug_enabled,
        }
    }

    /// Handle incoming event
    pub fn handle_event(&mut self, event: AppEvent) {
        log_event_with_tracing(&event);

        if self.json {
            if let Ok(line) = serde_json::to_string(&event) {
                println!("{line}");
            }
            return;
        }

        if let Some(line) = self.render(&event) {
            let _ = self.term.write_line(&line);
        }
    }

    fn render(&self, event: &AppEvent) -> Option<String> {
        match event {
            AppEvent::General(GeneralEvent::Warning { message, context }) => {
                let text = match context {
                    Some(context) => format!("warning: {message}: {context}"),
                    None => format!("warning: {message}"),
                };
                Some(self.paint_warning(&text))
            }
            AppEvent::General(GeneralEvent::DebugLog { message, .. }) => {
                self.debug_enabled.then(|| format!("debug: {message}"))
            }

            AppEvent::Download(DownloadEvent::Completed {
                archive,
                final_size,
                total_time,
                ..
            }) => Some(format!(
                "    {archive} ({final_size} bytes in {:.1}s)",
                total_time.as_secs_f64()
            )),
            AppEvent::Download(DownloadEvent::Started { .. }) => None,

            AppEvent::Pipeline(pipeline) => self.render_pipeline(pipeline),
        }
    }

    fn render_pipeline(&self, event: &PipelineEvent) -> Option<String> {
        match event {
            PipelineEvent::Started {
                formula, version, ..
            } => Some(self.paint_header(&format!("Installing {formula} {version}"))),
            PipelineEvent::Step { stage, detail, .. } => {
                Some(format!("{} {stage} {detail}", self.paint_arrow("==>")))
            }
            PipelineEvent::StageStarted { .. } | PipelineEvent::StageCompleted { .. } => None,
            PipelineEvent::ArtifactInstalled { destination, .. } => {
                Some(format!("{} install {}", self.paint_arrow("==>"), destination.display()))
            }
            PipelineEvent::Failed { stage, failure, .. } => {
                let stage = stage.map_or_else(|| "run".to_string(), |s| s.to_string());
                Some(self.paint_error(&format!("{stage} failed: {}", failure.message)))
            }
            PipelineEvent::Completed {
                formula,
                installed,
                duration,
                kept_scratch,
                ..
            } => {
                let mut line = self.paint_header(&format!(
                    "Installed {formula}: {} artifact(s) in {:.1}s",
                    installed.len(),
                    duration.as_secs_f64()
                ));
                if let Some(path) = kept_scratch {
                    line.push_str(&format!("\n    scratch kept at {}", path.display()));
                }
                Some(line)
            }
        }
    }

    fn paint_arrow(&self, text: &str) -> String {
        if self.colors_enabled {
            style(text).blue().bold().to_string()
        } else {
            text.to_string()
        }
    }

    fn paint_header(&self, text: &str) -> String {
        if self.colors_enabled {
            style(text).green().bold().to_string()
        } else {
            text.to_string()
        }
    }

    fn paint_warning(&self, text: &str) -> String {
        if self.colors_enabled {
            style(text).yellow().to_string()
        } else {
            text.to_string()
        }
    }

    fn paint_error(&self, text: &str) -> String {
        if self.colors_enabled {
            style(text).red().bold().to_string()
        } else {
            text.to_string()
        }
    }
}
