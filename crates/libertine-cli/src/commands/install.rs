use super::{json_pretty, registry_err, report_failure, run_operation, EXIT_FAILURE, EXIT_SUCCESS};
use libertine_core::{ContainerManager, OperationOutcome, OperationRequest};
use libertine_schema::{ContainerId, ItemStatus, PackageName};
use libertine_store::RegistryStore;

pub async fn run(
    manager: &ContainerManager,
    store: &RegistryStore,
    id: &str,
    package: &str,
    json: bool,
) -> Result<u8, String> {
    let pkg = PackageName::new(package);
    let request = OperationRequest::InstallPackage {
        id: ContainerId::new(id),
        package: pkg.clone(),
    };

    match run_operation(manager, request, !json).await? {
        OperationOutcome::Success(_) => {
            store
                .record_installed_app(id, &pkg, ItemStatus::Installed)
                .map_err(registry_err)?;
            if json {
                println!(
                    "{}",
                    json_pretty(&serde_json::json!({
                        "id": id,
                        "package": package,
                        "status": ItemStatus::Installed.to_string(),
                    }))?
                );
            } else {
                println!("installed {package} in {id}");
            }
            Ok(EXIT_SUCCESS)
        }
        OperationOutcome::Failure(failure) => {
            report_failure(&failure);
            Ok(EXIT_FAILURE)
        }
    }
}
