use std::fmt;

static DEFAULT_NAMESPACE: &str = "library";
static DEFAULT_TAG: &str = "latest";

/// Repository and tag of an image as the registry addresses it.
///
/// Repositories without an organization live in the registry's default namespace,
/// so `nginx` is stored as `library/nginx`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageReference {
    pub repository: String,
    pub tag: String,
}

impl ImageReference {
    /// Splits `repository[:tag]` on the first colon. No character validation happens here,
    /// malformed identifiers are rejected by the registry instead.
    pub fn parse(identifier: &str) -> Self {
        let (repository, tag) = match identifier.split_once(':') {
            Some((repository, tag)) => (repository, tag),
            None => (identifier, DEFAULT_TAG),
        };

        let repository = if repository.contains('/') {
            repository.to_string()
        } else {
            format!("{}/{}", DEFAULT_NAMESPACE, repository)
        };

        Self {
            repository,
            tag: tag.to_string(),
        }
    }
}

impl fmt::Display for ImageReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let repository = self
            .repository
            .strip_prefix(DEFAULT_NAMESPACE)
            .and_then(|rest| rest.strip_prefix('/'))
            .unwrap_or(&self.repository);
        write!(f, "{}:{}", repository, self.tag)
    }
}
