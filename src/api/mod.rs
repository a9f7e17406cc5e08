//! Read access to the Pulumi Cloud API.
//!
//! The collection engine depends only on the [`PulumiApi`] capability set; [`PulumiClient`] binds
//! it to the HTTPS REST API and test doubles implement the same trait.

use async_trait::async_trait;

mod client;
mod types;

pub use client::PulumiClient;
pub use types::*;

use crate::error::ApiError;

/// Page size used for every update history request.
pub const UPDATES_PAGE_SIZE: u32 = 100;

/// Typed read operations against the Pulumi Cloud API. Listing operations marked as paginated
/// follow continuation tokens until exhausted and return the concatenated result.
#[async_trait]
pub trait PulumiApi: Send + Sync {
    /// All stacks visible to the authenticated user (paginated).
    async fn list_stacks(&self) -> Result<Vec<StackSummary>, ApiError>;

    async fn get_resource_count(&self, stack: &StackKey) -> Result<ResourceCount, ApiError>;

    /// One page of a stack's update history.
    async fn list_updates(&self, stack: &StackKey, page: u32, page_size: u32) -> Result<Vec<UpdateInfo>, ApiError>;

    async fn list_org_deployments(&self, org: &str) -> Result<Vec<DeploymentInfo>, ApiError>;

    /// Organization members (paginated).
    async fn list_members(&self, org: &str) -> Result<Vec<MemberInfo>, ApiError>;

    async fn list_teams(&self, org: &str) -> Result<Vec<TeamInfo>, ApiError>;

    /// ESC environments (paginated).
    async fn list_environments(&self, org: &str) -> Result<Vec<EnvironmentInfo>, ApiError>;

    async fn list_policy_groups(&self, org: &str) -> Result<Vec<PolicyGroupInfo>, ApiError>;

    async fn list_policy_packs(&self, org: &str) -> Result<Vec<PolicyPackInfo>, ApiError>;

    async fn list_policy_violations(&self, org: &str) -> Result<Vec<PolicyViolation>, ApiError>;

    /// Neo AI tasks (paginated).
    async fn list_neo_tasks(&self, org: &str) -> Result<Vec<NeoTask>, ApiError>;

    async fn get_policy_results_metadata(&self, org: &str) -> Result<PolicyResultsMetadata, ApiError>;
}
