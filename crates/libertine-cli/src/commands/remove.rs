use super::{json_pretty, registry_err, report_failure, run_operation, EXIT_FAILURE, EXIT_SUCCESS};
use libertine_core::{ContainerManager, OperationOutcome, OperationRequest};
use libertine_schema::{ContainerId, PackageName};
use libertine_store::RegistryStore;

pub async fn run(
    manager: &ContainerManager,
    store: &RegistryStore,
    id: &str,
    package: &str,
    json: bool,
) -> Result<u8, String> {
    let pkg = PackageName::new(package);
    let request = OperationRequest::RemovePackage {
        id: ContainerId::new(id),
        package: pkg.clone(),
    };

    match run_operation(manager, request, !json).await? {
        OperationOutcome::Success(_) => {
            store.remove_installed_app(id, &pkg).map_err(registry_err)?;
            if json {
                println!(
                    "{}",
                    json_pretty(&serde_json::json!({
                        "id": id,
                        "package": package,
                        "removed": true,
                    }))?
                );
            } else {
                println!("removed {package} from {id}");
            }
            Ok(EXIT_SUCCESS)
        }
        OperationOutcome::Failure(failure) => {
            report_failure(&failure);
            Ok(EXIT_FAILURE)
        }
    }
}
