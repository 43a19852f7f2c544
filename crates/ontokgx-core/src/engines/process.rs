//! Spawning the ROBOT and KGX executables.

use std::process::Command;

/// `off`/`0`/`false`/`no` stops any engine process from being spawned.
pub const HOST_TOOLS_ENV: &str = "ONTOKGX_HOST_TOOLS";

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum EngineProcess {
    /// Switched off through [`HOST_TOOLS_ENV`]; nothing ran.
    Disabled,
    /// The executable could not be started.
    NotStarted(String),
    Exited {
        success: bool,
        stdout: String,
        stderr: String,
    },
}

pub(crate) fn spawn_engine(
    operation: &str,
    program: &str,
    args: &[String],
    envs: &[(&str, &str)],
) -> EngineProcess {
    let switch = std::env::var(HOST_TOOLS_ENV).ok();
    spawn_engine_with(switch.as_deref(), operation, program, args, envs)
}

fn spawn_engine_with(
    switch: Option<&str>,
    operation: &str,
    program: &str,
    args: &[String],
    envs: &[(&str, &str)],
) -> EngineProcess {
    if switched_off(switch) {
        tracing::warn!(operation, env = HOST_TOOLS_ENV, "engine processes are switched off");
        return EngineProcess::Disabled;
    }
    tracing::debug!(operation, program, ?args, "spawning engine");
    match Command::new(program).args(args).envs(envs.iter().copied()).output() {
        Ok(output) => EngineProcess::Exited {
            success: output.status.success(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        },
        Err(err) => EngineProcess::NotStarted(format!("{program}: {err}")),
    }
}

fn switched_off(raw: Option<&str>) -> bool {
    raw.is_some_and(|raw| {
        matches!(
            raw.trim().to_ascii_lowercase().as_str(),
            "0" | "off" | "false" | "no"
        )
    })
}

/// Trimmed stdout, else trimmed stderr, clipped to `max_chars`.
pub(crate) fn output_excerpt(stdout: &str, stderr: &str, max_chars: usize) -> Option<String> {
    let text = [stdout, stderr]
        .into_iter()
        .map(str::trim)
        .find(|text| !text.is_empty())?;
    Some(match text.char_indices().nth(max_chars) {
        Some((clip, _)) => format!("{}...", &text[..clip]),
        None => text.to_string(),
    })
}
