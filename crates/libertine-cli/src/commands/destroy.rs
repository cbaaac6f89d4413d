use super::{
    json_pretty, registry_err, report_failure, run_operation, spin_fail, spin_ok, spinner,
    EXIT_FAILURE, EXIT_SUCCESS,
};
use libertine_core::{ContainerManager, OperationOutcome, OperationRequest};
use libertine_schema::ContainerId;
use libertine_store::RegistryStore;

pub async fn run(
    manager: &ContainerManager,
    store: &RegistryStore,
    id: &str,
    json: bool,
) -> Result<u8, String> {
    let pb = (!json).then(|| spinner(&format!("destroying container {id}")));

    let request = OperationRequest::Destroy {
        id: ContainerId::new(id),
    };
    let outcome = match run_operation(manager, request, false).await {
        Ok(outcome) => outcome,
        Err(e) => {
            if let Some(pb) = &pb {
                spin_fail(pb, &format!("destroying container {id}"));
            }
            return Err(e);
        }
    };

    match outcome {
        OperationOutcome::Success(_) => {
            store.remove_container(id).map_err(registry_err)?;
            if let Some(pb) = &pb {
                spin_ok(pb, &format!("destroyed container {id}"));
            }
            if json {
                println!(
                    "{}",
                    json_pretty(&serde_json::json!({"id": id, "destroyed": true}))?
                );
            }
            Ok(EXIT_SUCCESS)
        }
        OperationOutcome::Failure(failure) => {
            if let Some(pb) = &pb {
                spin_fail(pb, &failure.description);
                let details = failure.details.trim_end();
                if !details.is_empty() {
                    eprintln!("{details}");
                }
            } else {
                report_failure(&failure);
            }
            Ok(EXIT_FAILURE)
        }
    }
}
