use super::{json_pretty, registry_err, report_failure, run_operation, EXIT_FAILURE, EXIT_SUCCESS};
use libertine_core::{ContainerManager, OperationOutcome, OperationRequest};
use libertine_schema::{ContainerId, InstallStatus};
use libertine_store::RegistryStore;

pub async fn run(
    manager: &ContainerManager,
    store: &RegistryStore,
    id: &str,
    json: bool,
) -> Result<u8, String> {
    let request = OperationRequest::Update {
        id: ContainerId::new(id),
    };

    match run_operation(manager, request, !json).await? {
        OperationOutcome::Success(_) => {
            store
                .set_install_status(id, InstallStatus::Ready)
                .map_err(registry_err)?;
            if json {
                println!(
                    "{}",
                    json_pretty(&serde_json::json!({
                        "id": id,
                        "status": InstallStatus::Ready.to_string(),
                    }))?
                );
            } else {
                println!("updated container {id}");
            }
            Ok(EXIT_SUCCESS)
        }
        OperationOutcome::Failure(failure) => {
            report_failure(&failure);
            Ok(EXIT_FAILURE)
        }
    }
}
