use futures::future::join_all;
use tracing::{info, warn};

use crate::models::test_definition::TestDefinition;
use crate::survey::provider::TestProvider;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadFailure {
    pub test_id: String,
    pub reason: String,
}

/// Tests that loaded, in the order their ids were requested, plus the ids
/// that did not.
#[derive(Debug, Clone, Default)]
pub struct LoadOutcome {
    pub tests: Vec<TestDefinition>,
    pub failures: Vec<LoadFailure>,
}

/// Requests every test concurrently. A failed fetch drops that test and is
/// reported in `failures`; it never aborts the others.
pub async fn load_tests(provider: &dyn TestProvider, test_ids: &[String]) -> LoadOutcome {
    let fetches = test_ids.iter().map(|id| async move {
        let result = provider.fetch_test(id).await;
        (id, result)
    });

    let mut outcome = LoadOutcome::default();
    for (id, result) in join_all(fetches).await {
        match result {
            Ok(test) => outcome.tests.push(test),
            Err(e) => {
                warn!("Error fetching test {id}: {e}");
                outcome.failures.push(LoadFailure {
                    test_id: id.clone(),
                    reason: e.to_string(),
                });
            }
        }
    }

    info!(
        "Loaded {} of {} requested tests",
        outcome.tests.len(),
        test_ids.len()
    );
    outcome
}
