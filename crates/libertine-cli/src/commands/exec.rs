use super::{json_pretty, report_failure, run_operation, EXIT_FAILURE, EXIT_SUCCESS};
use libertine_core::{ContainerManager, OperationOutcome, OperationPayload, OperationRequest};
use libertine_schema::ContainerId;

pub async fn run(
    manager: &ContainerManager,
    id: &str,
    command_line: &str,
    json: bool,
) -> Result<u8, String> {
    let request = OperationRequest::Exec {
        id: ContainerId::new(id),
        command_line: command_line.to_owned(),
    };

    match run_operation(manager, request, false).await? {
        OperationOutcome::Success(OperationPayload::CommandOutput(output)) => {
            if json {
                println!("{}", json_pretty(&serde_json::json!({"output": output}))?);
            } else {
                print!("{output}");
            }
            Ok(EXIT_SUCCESS)
        }
        OperationOutcome::Success(_) => Ok(EXIT_SUCCESS),
        OperationOutcome::Failure(failure) => {
            report_failure(&failure);
            Ok(EXIT_FAILURE)
        }
    }
}
