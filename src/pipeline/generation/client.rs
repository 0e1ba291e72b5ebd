use super::credentials::CredentialPool;
use super::provider::TextProvider;
use super::{is_quota_signature, GenerationError};

/// Provider wrapper that rotates credentials on quota failures.
pub struct GenerationClient<P: TextProvider> {
    provider: P,
    pool: CredentialPool,
}

impl<P: TextProvider> GenerationClient<P> {
    pub fn new(provider: P, pool: CredentialPool) -> Self {
        Self { provider, pool }
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    pub fn pool(&self) -> &CredentialPool {
        &self.pool
    }

    /// Generate text, starting from the current credential.
    ///
    /// Makes at most one attempt per credential. A quota/rate-limit failure
    /// rotates the cursor and tries the next one; any other failure aborts.
    pub fn try_generate(&self, prompt: &str, system_role: &str) -> Result<String, GenerationError> {
        if prompt.trim().is_empty() {
            return Err(GenerationError::EmptyPrompt);
        }

        let attempts = self.pool.len();
        let mut index = self.pool.cursor();

        for attempt in 1..=attempts {
            let credential = self.pool.credential(index).unwrap_or_default();
            match self.provider.generate(credential, system_role, prompt) {
                Ok(text) => {
                    tracing::debug!(attempt, credential = index, "Generation succeeded");
                    return Ok(text.trim().to_string());
                }
                Err(e) => {
                    let message = e.to_string();
                    if !is_quota_signature(&message) {
                        tracing::warn!(attempt, credential = index, error = %message, "Generation failed");
                        return Err(GenerationError::NonRetryable(message));
                    }
                    tracing::warn!(attempt, credential = index, "Credential over quota, rotating");
                    index = self.pool.rotate_from(index);
                }
            }
        }

        tracing::error!(attempts, "All credentials exhausted");
        Err(GenerationError::Exhausted { attempts })
    }

    /// Like `try_generate`, but failures become user-visible text.
    pub fn generate(&self, prompt: &str, system_role: &str) -> String {
        self.try_generate(prompt, system_role)
            .unwrap_or_else(|e| e.user_message())
    }
}
