//! Resolution of external platform logins to internal directory identities.
//!
//! Resolution is two-stage (login to identity, identity to display profile)
//! and degrades gracefully at both stages. Callers branch on presence only;
//! the cause of a miss is logged here and never propagated.
use crate::tracker::TrackerClient;

/// Opaque identifier of a user in the internal directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InternalIdentity(pub String);

impl std::fmt::Display for InternalIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Outcome of resolving an external login, carrying the fallback policy with
/// it so that renderers never reimplement it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolvedUser {
    Internal {
        identity: InternalIdentity,
        display_name: String,
    },
    External {
        login: String,
    },
}

pub struct IdentityResolver<'a> {
    tracker: &'a TrackerClient,
}

impl<'a> IdentityResolver<'a> {
    pub fn new(tracker: &'a TrackerClient) -> Self {
        Self { tracker }
    }

    /// Maps an external login to an internal identity. Any failure (not found,
    /// network error, empty body) collapses to `None`.
    pub async fn resolve_internal(&self, login: &str) -> Option<InternalIdentity> {
        match self.fetch_identity(login).await {
            Ok(identity) if !identity.is_empty() => Some(InternalIdentity(identity)),
            Ok(_) => {
                tracing::warn!("Empty internal identity returned for {login}");
                None
            }
            Err(error) => {
                tracing::warn!("Cannot resolve internal identity of {login}: {error:?}");
                None
            }
        }
    }

    async fn fetch_identity(&self, login: &str) -> anyhow::Result<String> {
        let response = self
            .tracker
            .get(&format!("identity/by-external-login/{login}"))
            .await?;
        let body = response.text().await?;
        Ok(body.trim().to_string())
    }

    /// Looks up the display name of an internal identity.
    pub async fn resolve_profile(&self, identity: &InternalIdentity) -> Option<String> {
        match self.fetch_profile(identity).await {
            Ok(profile) if !profile.full_name.trim().is_empty() => Some(profile.full_name),
            Ok(_) => None,
            Err(error) => {
                tracing::warn!("Cannot resolve profile of {identity}: {error:?}");
                None
            }
        }
    }

    async fn fetch_profile(&self, identity: &InternalIdentity) -> anyhow::Result<DisplayProfile> {
        let response = self.tracker.get(&format!("profile/{identity}")).await?;
        let profile = response.json::<DisplayProfile>().await?;
        Ok(profile)
    }

    /// Resolves a login with the uniform fallback policy: an internal identity
    /// with its profile name as display name, the identity itself when the
    /// profile lookup misses, or the external login when no identity exists.
    pub async fn resolve_user(&self, login: &str) -> ResolvedUser {
        match self.resolve_internal(login).await {
            Some(identity) => {
                let display_name = match self.resolve_profile(&identity).await {
                    Some(name) => name,
                    None => identity.0.clone(),
                };
                ResolvedUser::Internal {
                    identity,
                    display_name,
                }
            }
            None => ResolvedUser::External {
                login: login.to_string(),
            },
        }
    }
}

#[derive(serde::Deserialize)]
struct DisplayProfile {
    #[serde(rename = "fullName")]
    full_name: String,
}
