use std::time::{Duration, Instant};

use compass_config::{Generation, GenerationProviderConfig};
use serde::Serialize;

use crate::GenerationProvider;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GenerationState {
	Pending,
	Attempting,
	Succeeded,
	Retrying,
	Failed,
}

#[derive(Debug, Clone, Serialize)]
pub struct GenerationResult {
	pub success: bool,
	pub response: Option<String>,
	pub error: Option<String>,
	pub retry_count: u32,
	pub elapsed_ms: u64,
	pub footer_present: bool,
	pub fallback: bool,
}

/// Drive one generation request through its retry state machine. Provider
/// failures and timeouts surface in the result, never as an error.
pub(crate) async fn generate(
	provider: &dyn GenerationProvider,
	cfg: &GenerationProviderConfig,
	policy: &Generation,
	prompt: &str,
) -> GenerationResult {
	let started = Instant::now();
	let mut state = GenerationState::Pending;

	tracing::debug!(?state, "Generation requested.");

	let mut attempt = 0_u32;
	let mut backoff_ms = policy.backoff_initial_ms;
	let mut last_error: Option<String> = None;

	loop {
		attempt += 1;
		state = GenerationState::Attempting;

		tracing::debug!(?state, attempt, "Calling the generation provider.");

		let outcome = tokio::time::timeout(
			Duration::from_millis(cfg.timeout_ms),
			provider.complete(cfg, prompt),
		)
		.await;

		match outcome {
			Ok(Ok(response)) => {
				state = GenerationState::Succeeded;

				tracing::debug!(?state, attempt, "Generation succeeded.");

				let footer_present = response.contains(&policy.disclaimer_marker);

				if !footer_present {
					tracing::warn!("Generated answer is missing the disclaimer footer.");
				}

				return GenerationResult {
					success: true,
					response: Some(response),
					error: None,
					retry_count: attempt - 1,
					elapsed_ms: started.elapsed().as_millis() as u64,
					footer_present,
					fallback: false,
				};
			},
			Ok(Err(err)) => last_error = Some(err.to_string()),
			Err(_) => last_error = Some("Generation provider timed out.".to_string()),
		}

		if attempt > policy.max_retries {
			state = GenerationState::Failed;

			tracing::debug!(?state, attempt, error = ?last_error, "Generation failed.");

			return GenerationResult {
				success: false,
				response: None,
				error: last_error,
				retry_count: attempt - 1,
				elapsed_ms: started.elapsed().as_millis() as u64,
				footer_present: false,
				fallback: false,
			};
		}

		state = GenerationState::Retrying;

		tracing::debug!(?state, attempt, backoff_ms, "Retrying after backoff.");

		if backoff_ms > 0 {
			tokio::time::sleep(Duration::from_millis(backoff_ms)).await;
		}

		backoff_ms = backoff_ms.saturating_mul(2).min(policy.backoff_max_ms);
	}
}

#[cfg(test)]
mod tests {
	use std::sync::Mutex;

	use color_eyre::eyre::eyre;
	use compass_testkit::test_config;

	use super::*;

	// Local test double. `compass_testkit::ScriptedGeneration` cannot be used
	// here: testkit depends on this crate, so linking it into this crate's own
	// lib-test produces a second copy of `compass-service` whose
	// `GenerationProvider` is distinct from the one under test. This copy
	// mirrors testkit's implementation exactly and implements the local trait.
	enum Script {
		Succeed(String),
		Fail(String),
		Flaky { failures: u32, response: String },
	}

	struct ScriptedGeneration {
		script: Script,
		attempts: Mutex<u32>,
	}

	impl ScriptedGeneration {
		fn succeeding(response: &str) -> Self {
			Self { script: Script::Succeed(response.to_string()), attempts: Mutex::new(0) }
		}

		fn failing(message: &str) -> Self {
			Self { script: Script::Fail(message.to_string()), attempts: Mutex::new(0) }
		}

		fn flaky(failures: u32, response: &str) -> Self {
			Self {
				script: Script::Flaky { failures, response: response.to_string() },
				attempts: Mutex::new(0),
			}
		}

		fn attempts(&self) -> u32 {
			*self.attempts.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
		}
	}

	impl GenerationProvider for ScriptedGeneration {
		fn complete<'a>(
			&'a self,
			_cfg: &'a GenerationProviderConfig,
			_prompt: &'a str,
		) -> crate::BoxFuture<'a, color_eyre::Result<String>> {
			Box::pin(async move {
				let attempt = {
					let mut attempts =
						self.attempts.lock().unwrap_or_else(std::sync::PoisonError::into_inner);

					*attempts += 1;

					*attempts
				};

				match &self.script {
					Script::Succeed(response) => Ok(response.clone()),
					Script::Fail(message) => Err(eyre!("{message}")),
					Script::Flaky { failures, response } =>
						if attempt <= *failures {
							Err(eyre!("Scripted failure on attempt {attempt}."))
						} else {
							Ok(response.clone())
						},
				}
			})
		}
	}

	fn policy(max_retries: u32) -> Generation {
		Generation {
			max_retries,
			backoff_initial_ms: 0,
			backoff_max_ms: 0,
			disclaimer_marker: "consult a registered career counsellor".to_string(),
		}
	}

	#[tokio::test]
	async fn first_attempt_success_carries_the_footer_flag() {
		let cfg = test_config();
		let provider = ScriptedGeneration::succeeding(
			"1. Career: Engineer: builds things.\n\
			 Please consult a registered career counsellor before deciding.",
		);
		let result =
			generate(&provider, &cfg.providers.generation, &policy(2), "prompt").await;

		assert!(result.success);
		assert_eq!(result.retry_count, 0);
		assert!(result.footer_present);
		assert!(!result.fallback);
		assert_eq!(provider.attempts(), 1);
	}

	#[tokio::test]
	async fn zero_retries_fail_after_exactly_one_attempt() {
		let cfg = test_config();
		let provider = ScriptedGeneration::failing("provider unavailable");
		let result =
			generate(&provider, &cfg.providers.generation, &policy(0), "prompt").await;

		assert!(!result.success);
		assert_eq!(result.retry_count, 0);
		assert_eq!(provider.attempts(), 1);
		assert!(result.error.is_some());
	}

	#[tokio::test]
	async fn flaky_provider_succeeds_within_the_retry_budget() {
		let cfg = test_config();
		let provider = ScriptedGeneration::flaky(
			2,
			"Career: Nurse: cares for patients. Always consult a registered career \
			 counsellor before applying.",
		);
		let result =
			generate(&provider, &cfg.providers.generation, &policy(2), "prompt").await;

		assert!(result.success);
		assert_eq!(result.retry_count, 2);
		assert_eq!(provider.attempts(), 3);
	}

	#[tokio::test]
	async fn exhausted_retries_report_the_last_error() {
		let cfg = test_config();
		let provider = ScriptedGeneration::failing("rate limited");
		let result =
			generate(&provider, &cfg.providers.generation, &policy(2), "prompt").await;

		assert!(!result.success);
		assert_eq!(result.retry_count, 2);
		assert_eq!(provider.attempts(), 3);
		assert!(result.error.as_deref().is_some_and(|err| err.contains("rate limited")));
	}

	#[tokio::test]
	async fn missing_footer_still_counts_as_success() {
		let cfg = test_config();
		let provider = ScriptedGeneration::succeeding("1. Career: Engineer: builds things.");
		let result =
			generate(&provider, &cfg.providers.generation, &policy(2), "prompt").await;

		assert!(result.success);
		assert!(!result.footer_present);
	}
}
