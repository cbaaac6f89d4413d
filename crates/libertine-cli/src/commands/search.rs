use super::{json_pretty, report_failure, run_operation, EXIT_FAILURE, EXIT_SUCCESS};
use libertine_core::{ContainerManager, OperationOutcome, OperationPayload, OperationRequest};
use libertine_schema::ContainerId;

pub async fn run(
    manager: &ContainerManager,
    id: &str,
    query: &str,
    json: bool,
) -> Result<u8, String> {
    let request = OperationRequest::SearchCache {
        id: ContainerId::new(id),
        query: query.to_owned(),
    };

    match run_operation(manager, request, false).await? {
        OperationOutcome::Success(OperationPayload::SearchResults(results)) => {
            if json {
                println!("{}", json_pretty(&results)?);
            } else if results.is_empty() {
                println!("no packages matching '{query}'");
            } else {
                for result in &results {
                    println!("{result}");
                }
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
