use super::{json_pretty, report_failure, run_operation, EXIT_FAILURE, EXIT_SUCCESS};
use libertine_core::{ContainerManager, OperationOutcome, OperationRequest};

pub async fn run(manager: &ContainerManager, json: bool) -> Result<u8, String> {
    match run_operation(manager, OperationRequest::FixIntegrity, !json).await? {
        OperationOutcome::Success(_) => {
            if json {
                println!("{}", json_pretty(&serde_json::json!({"fixed": true}))?);
            } else {
                println!("package integrity restored");
            }
            Ok(EXIT_SUCCESS)
        }
        OperationOutcome::Failure(failure) => {
            report_failure(&failure);
            Ok(EXIT_FAILURE)
        }
    }
}
