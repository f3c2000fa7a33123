/// Decides whether a credential may write shared settings.
pub trait CredentialVerifier: Send + Sync {
    fn verify(&self, credential: &str) -> bool;
}

impl<F> CredentialVerifier for F
where
    F: Fn(&str) -> bool + Send + Sync,
{
    fn verify(&self, credential: &str) -> bool {
        self(credential)
    }
}

/// Compares against one shared secret taken from configuration.
#[derive(Clone)]
pub struct SharedSecretVerifier {
    secret: String,
}

impl SharedSecretVerifier {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
        }
    }
}

impl std::fmt::Debug for SharedSecretVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SharedSecretVerifier").finish_non_exhaustive()
    }
}

impl CredentialVerifier for SharedSecretVerifier {
    fn verify(&self, credential: &str) -> bool {
        let (a, b) = (self.secret.as_bytes(), credential.as_bytes());
        // Length leaks; contents are compared without early exit.
        a.len() == b.len() && a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
    }
}
