use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Identity of a monitored stack: organization, project and stack name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StackKey {
    pub org: String,
    pub project: String,
    pub stack: String,
}

impl StackKey {
    pub fn new(org: impl Into<String>, project: impl Into<String>, stack: impl Into<String>) -> Self {
        Self { org: org.into(), project: project.into(), stack: stack.into() }
    }
}

impl fmt::Display for StackKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.org, self.project, self.stack)
    }
}

/// Summary of a stack visible to the authenticated user. `last_update` and `resource_count` are
/// hints only; the authoritative values are fetched per stack.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StackSummary {
    pub org_name: String,
    pub project_name: String,
    pub stack_name: String,
    #[serde(default)]
    pub last_update: i64,
    #[serde(default)]
    pub resource_count: i64,
}

impl StackSummary {
    pub fn key(&self) -> StackKey {
        StackKey::new(&self.org_name, &self.project_name, &self.stack_name)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListStacksResponse {
    #[serde(default)]
    pub stacks: Vec<StackSummary>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub continuation_token: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceCount {
    #[serde(default)]
    pub count: i64,
    #[serde(default)]
    pub version: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListUpdatesResponse {
    #[serde(default)]
    pub updates: Vec<UpdateInfo>,
}

/// One historical apply or destroy operation against a stack. `version` strictly increases per
/// stack; `start_time` and `end_time` are unix seconds and are zero while an update is in flight.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateInfo {
    #[serde(default)]
    pub kind: String,
    #[serde(default)]
    pub result: String,
    #[serde(default)]
    pub start_time: i64,
    #[serde(default)]
    pub end_time: i64,
    #[serde(default)]
    pub resource_changes: HashMap<String, i64>,
    pub version: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListDeploymentsResponse {
    #[serde(default)]
    pub deployments: Vec<DeploymentInfo>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentInfo {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub created: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListMembersResponse {
    #[serde(default)]
    pub members: Vec<MemberInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub continuation_token: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberInfo {
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub user: UserInfo,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserInfo {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub github_login: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListTeamsResponse {
    #[serde(default)]
    pub teams: Vec<TeamInfo>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamInfo {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub kind: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListEnvironmentsResponse {
    #[serde(default)]
    pub environments: Vec<EnvironmentInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_token: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvironmentInfo {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub organization: String,
    #[serde(default)]
    pub project: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListPolicyGroupsResponse {
    #[serde(default)]
    pub policy_groups: Vec<PolicyGroupInfo>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PolicyGroupInfo {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub num_stacks: i64,
    #[serde(default)]
    pub num_enabled_policy_packs: i64,
    #[serde(default)]
    pub is_org_default: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListPolicyPacksResponse {
    #[serde(default)]
    pub policy_packs: Vec<PolicyPackInfo>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PolicyPackInfo {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub display_name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListPolicyViolationsResponse {
    #[serde(default)]
    pub policy_violations: Vec<PolicyViolation>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PolicyViolation {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub project_name: String,
    #[serde(default)]
    pub stack_name: String,
    #[serde(default)]
    pub policy_pack: String,
    #[serde(default)]
    pub policy_name: String,
    #[serde(default)]
    pub level: String,
    #[serde(default)]
    pub kind: String,
}

impl PolicyViolation {
    pub fn new(level: impl Into<String>, kind: impl Into<String>) -> Self {
        Self { level: level.into(), kind: kind.into(), ..Self::default() }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PolicyResultsMetadata {
    #[serde(default)]
    pub policy_total_count: i64,
    #[serde(default)]
    pub policy_with_issues_count: i64,
    #[serde(default)]
    pub resources_total_count: i64,
    #[serde(default)]
    pub resources_with_issues_count: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListNeoTasksResponse {
    #[serde(default)]
    pub tasks: Vec<NeoTask>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub continuation_token: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NeoTask {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub status: String,
}

/// A single page of a continuation-token paginated listing.
pub trait Page {
    type Item;

    fn into_parts(self) -> (Vec<Self::Item>, Option<String>);
}

impl Page for ListStacksResponse {
    type Item = StackSummary;

    fn into_parts(self) -> (Vec<Self::Item>, Option<String>) {
        (self.stacks, self.continuation_token)
    }
}

impl Page for ListMembersResponse {
    type Item = MemberInfo;

    fn into_parts(self) -> (Vec<Self::Item>, Option<String>) {
        (self.members, self.continuation_token)
    }
}

impl Page for ListEnvironmentsResponse {
    type Item = EnvironmentInfo;

    fn into_parts(self) -> (Vec<Self::Item>, Option<String>) {
        (self.environments, self.next_token)
    }
}

impl Page for ListNeoTasksResponse {
    type Item = NeoTask;

    fn into_parts(self) -> (Vec<Self::Item>, Option<String>) {
        (self.tasks, self.continuation_token)
    }
}
