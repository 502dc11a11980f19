//! Output rendering for command results

use comfy_table::{presets::UTF8_FULL, Cell, ContentArrangement, Table};
use console::style;
use formula_builder::{DependencyStatus, InstallOutcome, InstallPlan};
use serde::Serialize;
use std::io;
use std::path::{Path, PathBuf};

/// Final result of a command
pub enum CommandOutput {
    Installed(InstallOutcome),
    Fetched(Vec<PathBuf>),
    Plan(Box<InstallPlan>),
    Dependencies(Vec<DependencyStatus>),
    Digests(Vec<FileDigest>),
}

/// One line of `formula digest`
#[derive(Debug, Serialize)]
pub struct FileDigest {
    pub path: PathBuf,
    pub algorithm: String,
    pub digest: String,
}

/// Output renderer for CLI results
pub struct OutputRenderer {
    json_output: bool,
    colors_enabled: bool,
}

impl OutputRenderer {
    pub fn new(json_output: bool, colors_enabled: bool) -> Self {
        Self {
            json_output,
            colors_enabled,
        }
    }

    /// Render a command result on stdout
    pub fn render_result(&self, output: &CommandOutput) -> io::Result<()> {
        if self.json_output {
            return self.render_json(output);
        }
        match output {
            // Progress events already reported everything
            CommandOutput::Installed(_) => Ok(()),
            CommandOutput::Fetched(paths) => {
                for path in paths {
                    println!("{}", path.display());
                }
                Ok(())
            }
            CommandOutput::Plan(plan) => {
                self.render_plan(plan);
                Ok(())
            }
            CommandOutput::Dependencies(deps) => {
                self.render_dependencies(deps);
                Ok(())
            }
            CommandOutput::Digests(digests) => {
                for d in digests {
                    println!("{}  {}", d.digest, d.path.display());
                }
                Ok(())
            }
        }
    }

    fn render_json(&self, output: &CommandOutput) -> io::Result<()> {
        let value = match output {
            CommandOutput::Installed(outcome) => serde_json::json!({
                "run_id": outcome.run_id.to_string(),
                "installed": outcome.installed,
                "kept_scratch": outcome.kept_scratch,
                "duration_ms": u64::try_from(outcome.duration.as_millis()).unwrap_or(u64::MAX),
            }),
            CommandOutput::Fetched(paths) => serde_json::json!({ "fetched": paths }),
            CommandOutput::Plan(plan) => serde_json::to_value(plan).map_err(io::Error::other)?,
            CommandOutput::Dependencies(deps) => {
                serde_json::to_value(deps).map_err(io::Error::other)?
            }
            CommandOutput::Digests(digests) => {
                serde_json::to_value(digests).map_err(io::Error::other)?
            }
        };
        println!("{value}");
        Ok(())
    }

    fn render_plan(&self, plan: &InstallPlan) {
        println!("{}", self.heading(&format!("{} {}", plan.formula, plan.version)));

        println!("{}", self.heading("fetch"));
        for archive in &plan.archives {
            println!("  {}", archive.url);
            println!(
                "    {} {} -> {}{}",
                archive.digest.algorithm(),
                archive.digest,
                relative(&archive.unpack_dir, &plan.scratch_dir),
                if archive.strip_top_level {
                    " (strip top-level directory)"
                } else {
                    ""
                }
            );
        }

        println!("{}", self.heading("configure"));
        println!("  {}", plan.configure);
        println!("{}", self.heading("build"));
        println!("  {}", plan.compile);

        println!("{}", self.heading("install"));
        for item in &plan.installs {
            println!(
                "  {} -> {}",
                relative(&item.source, &plan.scratch_dir),
                item.destination.display()
            );
        }
    }

    fn render_dependencies(&self, deps: &[DependencyStatus]) {
        if deps.is_empty() {
            println!("No dependencies declared.");
            return;
        }

        let mut table = Table::new();
        table
            .load_preset(UTF8_FULL)
            .set_content_arrangement(ContentArrangement::Dynamic)
            .set_header(vec!["Name", "Stage", "Probe", "Found"]);

        for dep in deps {
            let found = dep
                .found
                .as_ref()
                .map_or_else(|| "missing".to_string(), |p| p.display().to_string());
            table.add_row(vec![
                Cell::new(&dep.name),
                Cell::new(dep.stage),
                Cell::new(&dep.probe),
                Cell::new(found),
            ]);
        }
        println!("{table}");
    }

    fn heading(&self, text: &str) -> String {
        if self.colors_enabled {
            style(text).bold().to_string()
        } else {
            text.to_string()
        }
    }
}

fn relative(path: &Path, base: &Path) -> String {
    path.strip_prefix(base).map_or_else(
        |_| path.display().to_string(),
        |rel| format!("<scratch>/{}", rel.display()),
    )
}
