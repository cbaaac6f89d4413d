use super::{json_pretty, registry_err, report_failure, run_operation, EXIT_FAILURE, EXIT_SUCCESS};
use libertine_core::{ContainerManager, OperationOutcome, OperationRequest};
use libertine_schema::{ContainerId, ItemStatus};
use libertine_store::RegistryStore;
use std::path::Path;

pub async fn run(
    manager: &ContainerManager,
    store: &RegistryStore,
    id: &str,
    archive: &str,
    public_key_file: Option<&Path>,
    json: bool,
) -> Result<u8, String> {
    let key_bytes = match public_key_file {
        Some(path) => Some(
            std::fs::read(path)
                .map_err(|e| format!("failed to read key file {}: {e}", path.display()))?,
        ),
        None => None,
    };

    let (request, key_path) =
        OperationRequest::add_archive(ContainerId::new(id), archive, key_bytes.as_deref())
            .map_err(|e| format!("signing key could not be written: {e}"))?;

    let outcome = run_operation(manager, request, !json).await?;
    // The temp keyfile must survive until the tool has read it.
    drop(key_path);

    match outcome {
        OperationOutcome::Success(_) => {
            store
                .record_archive(id, archive, ItemStatus::Installed)
                .map_err(registry_err)?;
            if json {
                println!(
                    "{}",
                    json_pretty(&serde_json::json!({
                        "id": id,
                        "archive": archive,
                        "status": ItemStatus::Installed.to_string(),
                    }))?
                );
            } else {
                println!("added archive {archive} to {id}");
            }
            Ok(EXIT_SUCCESS)
        }
        OperationOutcome::Failure(failure) => {
            report_failure(&failure);
            Ok(EXIT_FAILURE)
        }
    }
}
