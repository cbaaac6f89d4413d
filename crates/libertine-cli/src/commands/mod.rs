pub mod add_archive;
pub mod completions;
pub mod configure;
pub mod create;
pub mod destroy;
pub mod exec;
pub mod fix_integrity;
pub mod install;
pub mod list;
pub mod remove;
pub mod search;
pub mod set_default;
pub mod update;

use indicatif::{ProgressBar, ProgressStyle};
use libertine_core::{
    ContainerManager, OperationDetails, OperationError, OperationFailure, OperationKey,
    OperationOutcome, OperationRequest,
};
use std::io::Write;
use std::sync::OnceLock;
use std::time::Duration;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::watch;

pub const EXIT_SUCCESS: u8 = 0;
pub const EXIT_FAILURE: u8 = 1;
pub const EXIT_INVALID_REQUEST: u8 = 2;
pub const EXIT_REGISTRY_ERROR: u8 = 3;

pub fn json_pretty(value: &impl serde::Serialize) -> Result<String, String> {
    serde_json::to_string_pretty(value).map_err(|e| format!("JSON serialization failed: {e}"))
}

pub fn registry_err(e: libertine_store::StoreError) -> String {
    format!("registry error: {e}")
}

pub fn spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::with_template("{spinner:.cyan} {msg}")
            .expect("valid template")
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
    );
    pb.set_message(msg.to_owned());
    pb.enable_steady_tick(Duration::from_millis(80));
    pb
}

pub fn spin_ok(pb: &ProgressBar, msg: &str) {
    pb.set_style(ProgressStyle::with_template("{msg}").expect("valid template"));
    pb.finish_with_message(format!("✓ {msg}"));
}

pub fn spin_fail(pb: &ProgressBar, msg: &str) {
    pb.set_style(ProgressStyle::with_template("{msg}").expect("valid template"));
    pb.finish_with_message(format!("✗ {msg}"));
}

pub fn colorize_status(status: &str) -> String {
    use console::Style;
    match status {
        "ready" | "installed" => Style::new().green().apply_to(status).to_string(),
        "installing" | "updating" => Style::new().cyan().bold().apply_to(status).to_string(),
        "new" | "removing" => Style::new().yellow().apply_to(status).to_string(),
        "failed" => Style::new().red().apply_to(status).to_string(),
        "removed" | "unknown" => Style::new().dim().apply_to(status).to_string(),
        other => other.to_owned(),
    }
}

static INTERRUPT: OnceLock<watch::Receiver<bool>> = OnceLock::new();

/// Receiver that fires once on the first Ctrl-C. The handler can only be
/// installed once per process, so the channel is process-global.
pub fn interrupt_watcher() -> watch::Receiver<bool> {
    INTERRUPT
        .get_or_init(|| {
            let (tx, rx) = watch::channel(false);
            let _ = ctrlc::set_handler(move || {
                let _ = tx.send(true);
            });
            rx
        })
        .clone()
}

/// Print the failure the way the front end always has: the short description
/// on one line, the tool's own diagnostics after it.
pub fn report_failure(failure: &OperationFailure) {
    eprintln!("{}", failure.description);
    let details = failure.details.trim_end();
    if !details.is_empty() {
        eprintln!("{details}");
    }
}

/// Submit one operation and drive it to its terminal outcome.
///
/// With `stream` set, transcript chunks for this operation are echoed to
/// stdout as they arrive. Ctrl-C tears down the manager, which kills the
/// running child; the worker then reports a normal failure outcome.
pub async fn run_operation(
    manager: &ContainerManager,
    request: OperationRequest,
    stream: bool,
) -> Result<OperationOutcome, String> {
    let transcripts = manager.transcripts();
    let mut updates = transcripts.subscribe();
    let handle = manager.submit(request).map_err(|e| match e {
        OperationError::InvalidRequest(inner) => format!("invalid request: {inner}"),
        other => other.to_string(),
    })?;
    let key = handle.key().clone();

    let mut interrupt = interrupt_watcher();
    let mut printed = 0;
    let wait = handle.wait();
    tokio::pin!(wait);

    let outcome = loop {
        tokio::select! {
            outcome = &mut wait => break outcome,
            update = updates.recv() => {
                // A lagged receiver resynchronizes from the aggregator, so
                // a chatty tool overflowing the channel loses no output.
                let advance = match update {
                    Ok(update) => update.key == key,
                    Err(RecvError::Lagged(_)) => true,
                    Err(RecvError::Closed) => false,
                };
                if stream && advance {
                    print!("{}", drain_new_output(&transcripts, &key, &mut printed));
                    let _ = std::io::stdout().flush();
                }
            }
            _ = interrupt.changed() => {
                eprintln!("interrupted; terminating running operations");
                manager.shutdown();
            }
        }
    };

    // The worker appends every chunk before the outcome is sent, so one
    // final drain covers anything that raced with completion.
    if stream {
        print!("{}", drain_new_output(&transcripts, &key, &mut printed));
        let _ = std::io::stdout().flush();
    }
    transcripts.clear(&key);

    Ok(outcome)
}

/// Text appended to `key`'s transcript since the last call. `printed` tracks
/// how much of the accumulated transcript has been shown already.
fn drain_new_output(
    transcripts: &OperationDetails,
    key: &OperationKey,
    printed: &mut usize,
) -> String {
    let full = transcripts.details(key);
    let new = full[*printed..].to_owned();
    *printed = full.len();
    new
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_pretty_serializes_string() {
        let val = serde_json::json!({"key": "value"});
        let result = json_pretty(&val).unwrap();
        assert!(result.contains("\"key\""));
        assert!(result.contains("\"value\""));
    }

    #[test]
    fn json_pretty_serializes_array() {
        let val = vec![1, 2, 3];
        let result = json_pretty(&val).unwrap();
        assert!(result.contains('1'));
    }

    #[test]
    fn colorize_status_ready() {
        assert!(colorize_status("ready").contains("ready"));
    }

    #[test]
    fn colorize_status_installing() {
        assert!(colorize_status("installing").contains("installing"));
    }

    #[test]
    fn colorize_status_failed() {
        assert!(colorize_status("failed").contains("failed"));
    }

    #[test]
    fn colorize_status_unknown_passthrough() {
        assert_eq!(colorize_status("weird"), "weird");
    }

    #[test]
    fn exit_codes_are_distinct() {
        assert_ne!(EXIT_SUCCESS, EXIT_FAILURE);
        assert_ne!(EXIT_FAILURE, EXIT_INVALID_REQUEST);
        assert_ne!(EXIT_INVALID_REQUEST, EXIT_REGISTRY_ERROR);
    }

    #[test]
    fn drain_new_output_catches_up_after_missed_notifications() {
        use libertine_schema::ContainerId;

        let details = OperationDetails::new();
        let key = OperationKey::Container(ContainerId::new("c"));
        let mut printed = 0;

        details.update(&key, "one ");
        assert_eq!(drain_new_output(&details, &key, &mut printed), "one ");

        // Several chunks land between drains, as after a lagged receiver;
        // the next drain yields all of them exactly once.
        details.update(&key, "two ");
        details.update(&key, "three");
        assert_eq!(drain_new_output(&details, &key, &mut printed), "two three");
        assert_eq!(drain_new_output(&details, &key, &mut printed), "");
    }

    #[test]
    fn registry_err_is_prefixed() {
        let msg = registry_err(libertine_store::StoreError::ContainerNotFound("c".to_owned()));
        assert!(msg.starts_with("registry error:"));
    }

    #[test]
    fn spinner_creates_progress_bar() {
        let pb = spinner("testing...");
        spin_ok(&pb, "done");
    }

    #[test]
    fn spinner_fail_creates_progress_bar() {
        let pb = spinner("testing...");
        spin_fail(&pb, "failed");
    }
}
