use super::{json_pretty, registry_err, report_failure, run_operation, EXIT_FAILURE, EXIT_SUCCESS};
use libertine_core::{ContainerManager, OperationOutcome, OperationRequest};
use libertine_schema::{ContainerEntry, ContainerId, InstallStatus};
use libertine_store::RegistryStore;
use std::io::Read;

pub struct CreateArgs<'a> {
    pub id: &'a str,
    pub name: Option<&'a str>,
    pub distro: &'a str,
    pub container_type: &'a str,
    pub multiarch: bool,
    pub password_stdin: bool,
}

pub async fn run(
    manager: &ContainerManager,
    store: &RegistryStore,
    args: CreateArgs<'_>,
    json: bool,
) -> Result<u8, String> {
    let password = if args.password_stdin {
        let mut buf = Vec::new();
        std::io::stdin()
            .read_to_end(&mut buf)
            .map_err(|e| format!("failed to read password from stdin: {e}"))?;
        while matches!(buf.last(), Some(b'\n' | b'\r')) {
            buf.pop();
        }
        Some(buf)
    } else {
        None
    };

    // Reserve the registry slot first so a clashing id gets its suffix
    // before the tool ever sees it.
    let entry = ContainerEntry::new(
        ContainerId::new(args.id),
        args.name.unwrap_or(args.id),
        args.container_type,
        args.distro,
    );
    let actual_id = store.add_container(entry).map_err(registry_err)?;
    let recorded_name = store
        .load()
        .map_err(registry_err)?
        .find(actual_id.as_str())
        .map_or_else(|| args.name.unwrap_or(args.id).to_owned(), |c| c.name.clone());

    let request = OperationRequest::Create {
        id: actual_id.clone(),
        name: recorded_name,
        distro: args.distro.to_owned(),
        multiarch: args.multiarch,
        password,
    };

    match run_operation(manager, request, !json).await? {
        OperationOutcome::Success(_) => {
            store
                .set_install_status(actual_id.as_str(), InstallStatus::Ready)
                .map_err(registry_err)?;
            if json {
                println!(
                    "{}",
                    json_pretty(&serde_json::json!({
                        "id": actual_id.as_str(),
                        "status": InstallStatus::Ready.to_string(),
                    }))?
                );
            } else {
                println!("created container {actual_id}");
            }
            Ok(EXIT_SUCCESS)
        }
        OperationOutcome::Failure(failure) => {
            store
                .set_install_status(actual_id.as_str(), InstallStatus::Failed)
                .map_err(registry_err)?;
            report_failure(&failure);
            Ok(EXIT_FAILURE)
        }
    }
}
