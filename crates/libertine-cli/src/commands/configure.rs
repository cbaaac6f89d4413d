use super::{json_pretty, report_failure, run_operation, EXIT_FAILURE, EXIT_SUCCESS};
use libertine_core::{ContainerManager, OperationOutcome, OperationRequest};
use libertine_schema::ContainerId;

pub async fn run(
    manager: &ContainerManager,
    id: &str,
    subcommand: &str,
    args: &[String],
    json: bool,
) -> Result<u8, String> {
    let request = OperationRequest::Configure {
        id: ContainerId::new(id),
        subcommand: subcommand.to_owned(),
        args: args.to_vec(),
    };

    match run_operation(manager, request, !json).await? {
        OperationOutcome::Success(_) => {
            if json {
                println!(
                    "{}",
                    json_pretty(&serde_json::json!({"id": id, "configured": true}))?
                );
            } else {
                println!("configured container {id}");
            }
            Ok(EXIT_SUCCESS)
        }
        OperationOutcome::Failure(failure) => {
            report_failure(&failure);
            Ok(EXIT_FAILURE)
        }
    }
}
