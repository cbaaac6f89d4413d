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
    id: Option<&str>,
    json: bool,
) -> Result<u8, String> {
    let action = match id {
        Some(id) => format!("setting {id} as default container"),
        None => "clearing default container".to_owned(),
    };
    let pb = (!json).then(|| spinner(&action));

    let request = OperationRequest::SetDefault {
        id: id.map(ContainerId::new),
    };
    let outcome = match run_operation(manager, request, false).await {
        Ok(outcome) => outcome,
        Err(e) => {
            if let Some(pb) = &pb {
                spin_fail(pb, &action);
            }
            return Err(e);
        }
    };

    match outcome {
        OperationOutcome::Success(_) => {
            match id {
                Some(id) => store.set_default(id).map_err(registry_err)?,
                None => store.clear_default().map_err(registry_err)?,
            }
            if let Some(pb) = &pb {
                spin_ok(pb, &action);
            }
            if json {
                println!(
                    "{}",
                    json_pretty(&serde_json::json!({"default": id.unwrap_or("")}))?
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
