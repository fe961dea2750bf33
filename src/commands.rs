use crate::{emit_success, OutputMode};
use owo_colors::OwoColorize;
use scopechain::config::{self, ScopechainConfig};
use scopechain::script::{demo_scripts, Script, ScriptReport, ScriptRunner, StepOutcome};
use scopechain::ui::{self, chain_table, section, success, summary_row, theme, Icons};
use std::path::Path;

pub fn run_version(output_mode: OutputMode) -> anyhow::Result<()> {
    if output_mode.is_human() {
        ui::banner(
            &format!("{}", "Scopechain".bold()),
            &format!("Version {}", env!("CARGO_PKG_VERSION")),
        );
    } else {
        let data = serde_json::json!({
            "version": env!("CARGO_PKG_VERSION"),
        });
        emit_success(output_mode, "version", data)?;
    }
    Ok(())
}

pub fn run_init(output_mode: OutputMode, path: &Path, force: bool) -> anyhow::Result<()> {
    config::write_config(path, &ScopechainConfig::starter(), force)?;
    if output_mode.is_human() {
        success(&format!("Wrote {}", path.display()));
    } else {
        emit_success(output_mode, "init", serde_json::json!({ "path": path }))?;
    }
    Ok(())
}

pub fn run_demo(
    output_mode: OutputMode,
    config: &ScopechainConfig,
    only: Option<&str>,
) -> anyhow::Result<()> {
    let scripts: Vec<_> = demo_scripts()
        .into_iter()
        .filter(|(name, _)| only.is_none_or(|wanted| wanted == *name))
        .collect();
    if scripts.is_empty() {
        let known: Vec<_> = demo_scripts().into_iter().map(|(name, _)| name).collect();
        anyhow::bail!(
            "unknown demo '{}' (available: {})",
            only.unwrap_or_default(),
            known.join(", ")
        );
    }

    if output_mode.is_human() {
        ui::banner(
            &format!("{} Scopechain demonstrations", Icons::ROCKET),
            &format!("{} script(s)", scripts.len()),
        );
    }

    let mut reports = serde_json::Map::new();
    for (name, script) in scripts {
        // Each demonstration starts from an empty stack
        let mut runner = ScriptRunner::new().with_root_kind(config.root_kind());
        let report = runner.run(&script)?;
        if output_mode.is_human() {
            section(name);
            print_report(&report);
        } else {
            reports.insert(name.to_string(), serde_json::to_value(&report)?);
        }
    }

    emit_success(output_mode, "demo", serde_json::Value::Object(reports))
}

pub fn run_script(
    output_mode: OutputMode,
    config: &ScopechainConfig,
    path: &Path,
) -> anyhow::Result<()> {
    tracing::info!("Replaying {}", path.display());
    let script = Script::load(path)?;
    let mut runner = ScriptRunner::new().with_root_kind(config.root_kind());
    let report = runner.run(&script)?;

    if output_mode.is_human() {
        section(&path.display().to_string());
        print_report(&report);
        Ok(())
    } else {
        emit_success(output_mode, "run", serde_json::to_value(&report)?)
    }
}

fn print_report(report: &ScriptReport) {
    for (index, outcome) in report.outcomes.iter().enumerate() {
        let line = describe(outcome);
        println!("  {:>3}. {}", index + 1, line);
    }

    println!();
    if report.aborted {
        ui::warn("Run aborted by an uncaught failure");
    }
    if report.final_state.is_empty() {
        summary_row("Active scope:", &ui::muted("<none>"));
    } else {
        summary_row(
            "Variables reachable:",
            &report.final_state.variable_count().to_string(),
        );
        println!("{}", chain_table(&report.final_state));
    }
}

fn describe(outcome: &StepOutcome) -> String {
    let ident = |text: String| text.style(theme().ident.clone()).to_string();
    match outcome {
        StepOutcome::Enter { scope, kind, depth } => format!(
            "{} enter {} ({}, depth {})",
            Icons::DOWN,
            ident(scope.to_string()),
            kind,
            depth
        ),
        StepOutcome::Exit { scope, restored } => format!(
            "{} exit {} → {}",
            Icons::UP,
            ident(scope.to_string()),
            restored
                .map(|id| ident(id.to_string()))
                .unwrap_or_else(|| ui::muted("<none>"))
        ),
        StepOutcome::Create {
            name,
            variable,
            owner,
            reused,
        } => {
            let verb = if *reused {
                format!("{} reuse", Icons::LINK)
            } else {
                format!("{} create", Icons::NEW)
            };
            format!(
                "{} '{}' = {} in {}",
                verb,
                name,
                ident(variable.to_string()),
                owner
            )
        }
        StepOutcome::Lookup {
            name,
            variable: Some(variable),
            distance,
        } => format!(
            "{} lookup '{}' = {} ({} hop(s) up)",
            Icons::SEARCH,
            name,
            ident(variable.to_string()),
            distance.unwrap_or_default()
        ),
        StepOutcome::Lookup { name, .. } => format!(
            "{} lookup '{}' {}",
            Icons::SEARCH,
            name,
            ui::dim("not found")
        ),
        StepOutcome::Remove { name, removed } => format!(
            "{} remove '{}' {}",
            Icons::DEL,
            name,
            if *removed {
                "removed".to_string()
            } else {
                ui::dim("not local")
            }
        ),
        StepOutcome::Failed {
            message,
            caught,
            restored,
        } => format!(
            "{} fail \"{}\" {} → {}",
            Icons::BOLT,
            message.style(theme().error.clone()),
            if *caught { "caught" } else { "uncaught" },
            restored
                .map(|id| ident(id.to_string()))
                .unwrap_or_else(|| ui::muted("<none>"))
        ),
    }
}
