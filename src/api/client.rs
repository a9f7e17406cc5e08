use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{self, HeaderMap, HeaderValue};
use serde::de::DeserializeOwned;
use url::Url;

use super::types::*;
use super::PulumiApi;
use crate::error::ApiError;
use crate::settings::PulumiSettings;

const CONTINUATION_TOKEN: &str = "continuationToken";
const NEO_TASKS_PAGE_SIZE: u32 = 100;

/// Pulumi Cloud REST API client. Requests carry the access token and a per-request timeout;
/// failed requests are not retried.
#[derive(Debug, Clone)]
pub struct PulumiClient {
    client: reqwest::Client,
    base_url: Url,
}

impl PulumiClient {
    pub fn new(base_url: Url, access_token: &str, request_timeout: Duration) -> Result<Self, ApiError> {
        if base_url.cannot_be_a_base() {
            return Err(ApiError::NotABaseUrl(base_url));
        }

        let mut authorization = HeaderValue::from_str(&format!("token {access_token}"))?;
        authorization.set_sensitive(true);

        let mut headers = HeaderMap::with_capacity(2);
        headers.insert(header::AUTHORIZATION, authorization);
        headers.insert(header::ACCEPT, HeaderValue::from_static("application/json"));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(request_timeout)
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(ApiError::Client)?;

        Ok(Self { client, base_url })
    }

    pub fn from_settings(settings: &PulumiSettings) -> Result<Self, ApiError> {
        Self::new(
            settings.api_url.clone(),
            settings.access_token.as_str(),
            settings.request_timeout,
        )
    }

    fn endpoint(&self, segments: &[&str], query: &[(&str, String)]) -> Result<Url, ApiError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ApiError::NotABaseUrl(self.base_url.clone()))?
            .pop_if_empty()
            .extend(segments);

        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query);
        }

        Ok(url)
    }

    #[tracing::instrument(level = "trace", skip(self))]
    async fn get<T: DeserializeOwned>(&self, operation: &'static str, url: Url) -> Result<T, ApiError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|err| ApiError::http(operation, err))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ApiError::UnexpectedStatus { operation, status });
        }

        let body = response.bytes().await.map_err(|err| ApiError::http(operation, err))?;
        serde_json::from_slice(&body).map_err(|err| ApiError::decode(operation, err))
    }

    /// Follows continuation tokens until the API signals no more pages, concatenating every page
    /// in order.
    async fn get_all<P>(
        &self, operation: &'static str, segments: &[&str], query: &[(&str, String)],
    ) -> Result<Vec<P::Item>, ApiError>
    where
        P: Page + DeserializeOwned,
    {
        let mut items = Vec::new();
        let mut continuation: Option<String> = None;

        loop {
            let mut page_query = query.to_vec();
            if let Some(token) = continuation.take() {
                page_query.push((CONTINUATION_TOKEN, token));
            }

            let page: P = self.get(operation, self.endpoint(segments, &page_query)?).await?;
            let (page_items, next) = page.into_parts();
            tracing::trace!(%operation, page_len=%page_items.len(), ?next, "received page");
            items.extend(page_items);

            match next {
                Some(token) if !token.is_empty() => continuation = Some(token),
                _ => break,
            }
        }

        Ok(items)
    }
}

#[async_trait]
impl PulumiApi for PulumiClient {
    #[tracing::instrument(level = "debug", skip(self))]
    async fn list_stacks(&self) -> Result<Vec<StackSummary>, ApiError> {
        self.get_all::<ListStacksResponse>("listing stacks", &["api", "user", "stacks"], &[])
            .await
    }

    #[tracing::instrument(level = "debug", skip(self, stack), fields(%stack))]
    async fn get_resource_count(&self, stack: &StackKey) -> Result<ResourceCount, ApiError> {
        let url = self.endpoint(
            &[
                "api",
                "stacks",
                stack.org.as_str(),
                stack.project.as_str(),
                stack.stack.as_str(),
                "resources",
                "count",
            ],
            &[],
        )?;
        self.get("getting resource count", url).await
    }

    #[tracing::instrument(level = "debug", skip(self, stack), fields(%stack))]
    async fn list_updates(&self, stack: &StackKey, page: u32, page_size: u32) -> Result<Vec<UpdateInfo>, ApiError> {
        let url = self.endpoint(
            &["api", "stacks", stack.org.as_str(), stack.project.as_str(), stack.stack.as_str(), "updates"],
            &[("page", page.to_string()), ("pageSize", page_size.to_string())],
        )?;
        let response: ListUpdatesResponse = self.get("listing updates", url).await?;
        Ok(response.updates)
    }

    #[tracing::instrument(level = "debug", skip(self))]
    async fn list_org_deployments(&self, org: &str) -> Result<Vec<DeploymentInfo>, ApiError> {
        let url = self.endpoint(&["api", "orgs", org, "deployments"], &[])?;
        let response: ListDeploymentsResponse = self.get("listing org deployments", url).await?;
        Ok(response.deployments)
    }

    #[tracing::instrument(level = "debug", skip(self))]
    async fn list_members(&self, org: &str) -> Result<Vec<MemberInfo>, ApiError> {
        self.get_all::<ListMembersResponse>("listing members", &["api", "orgs", org, "members"], &[])
            .await
    }

    #[tracing::instrument(level = "debug", skip(self))]
    async fn list_teams(&self, org: &str) -> Result<Vec<TeamInfo>, ApiError> {
        let url = self.endpoint(&["api", "orgs", org, "teams"], &[])?;
        let response: ListTeamsResponse = self.get("listing teams", url).await?;
        Ok(response.teams)
    }

    #[tracing::instrument(level = "debug", skip(self))]
    async fn list_environments(&self, org: &str) -> Result<Vec<EnvironmentInfo>, ApiError> {
        self.get_all::<ListEnvironmentsResponse>("listing environments", &["api", "esc", "environments", org], &[])
            .await
    }

    #[tracing::instrument(level = "debug", skip(self))]
    async fn list_policy_groups(&self, org: &str) -> Result<Vec<PolicyGroupInfo>, ApiError> {
        let url = self.endpoint(&["api", "orgs", org, "policygroups"], &[])?;
        let response: ListPolicyGroupsResponse = self.get("listing policy groups", url).await?;
        Ok(response.policy_groups)
    }

    #[tracing::instrument(level = "debug", skip(self))]
    async fn list_policy_packs(&self, org: &str) -> Result<Vec<PolicyPackInfo>, ApiError> {
        let url = self.endpoint(&["api", "orgs", org, "policypacks"], &[])?;
        let response: ListPolicyPacksResponse = self.get("listing policy packs", url).await?;
        Ok(response.policy_packs)
    }

    #[tracing::instrument(level = "debug", skip(self))]
    async fn list_policy_violations(&self, org: &str) -> Result<Vec<PolicyViolation>, ApiError> {
        let url = self.endpoint(&["api", "orgs", org, "policyresults", "violationsv2"], &[])?;
        let response: ListPolicyViolationsResponse = self.get("listing policy violations", url).await?;
        Ok(response.policy_violations)
    }

    #[tracing::instrument(level = "debug", skip(self))]
    async fn list_neo_tasks(&self, org: &str) -> Result<Vec<NeoTask>, ApiError> {
        self.get_all::<ListNeoTasksResponse>(
            "listing neo tasks",
            &["api", "preview", "agents", org, "tasks"],
            &[("pageSize", NEO_TASKS_PAGE_SIZE.to_string())],
        )
        .await
    }

    #[tracing::instrument(level = "debug", skip(self))]
    async fn get_policy_results_metadata(&self, org: &str) -> Result<PolicyResultsMetadata, ApiError> {
        let url = self.endpoint(&["api", "orgs", org, "policyresults", "metadata"], &[])?;
        self.get("getting policy results metadata", url).await
    }
}

#[cfg(test)]
mod tests {
    use claim::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn client_for(server: &MockServer) -> PulumiClient {
        let base_url = Url::parse(&server.uri()).expect("failed parsing mock server uri");
        PulumiClient::new(base_url, "test-token", Duration::from_secs(5)).expect("failed creating client")
    }

    #[tokio::test]
    async fn test_requests_carry_auth_and_accept_headers() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/orgs/acme/teams"))
            .and(header("Authorization", "token test-token"))
            .and(header("Accept", "application/json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "teams": [{"name": "platform", "displayName": "Platform", "kind": "pulumi"}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let teams = assert_ok!(client_for(&server).list_teams("acme").await);
        assert_eq!(teams.len(), 1);
        assert_eq!(teams[0].display_name, "Platform");
    }

    #[tokio::test]
    async fn test_list_stacks_follows_continuation_tokens() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/user/stacks"))
            .and(query_param("continuationToken", "page2token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "stacks": [{"orgName": "org2", "projectName": "proj2", "stackName": "prod"}]
            })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/user/stacks"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "stacks": [{"orgName": "org1", "projectName": "proj1", "stackName": "dev", "lastUpdate": 1700000000}],
                "continuationToken": "page2token"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let stacks = assert_ok!(client_for(&server).list_stacks().await);
        let keys: Vec<String> = stacks.iter().map(|s| s.key().to_string()).collect();
        assert_eq!(keys, vec!["org1/proj1/dev".to_string(), "org2/proj2/prod".to_string()]);
        assert_eq!(stacks[0].last_update, 1_700_000_000);
    }

    #[tokio::test]
    async fn test_empty_continuation_token_ends_pagination() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/orgs/acme/members"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "members": [{"role": "admin", "user": {"name": "Ada", "githubLogin": "ada"}}],
                "continuationToken": ""
            })))
            .expect(1)
            .mount(&server)
            .await;

        let members = assert_ok!(client_for(&server).list_members("acme").await);
        assert_eq!(members.len(), 1);
        assert_eq!(members[0].user.github_login, "ada");
    }

    #[tokio::test]
    async fn test_list_environments_follows_next_token() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/esc/environments/acme"))
            .and(query_param("continuationToken", "next"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "environments": [{"name": "prod"}]
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/esc/environments/acme"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "environments": [{"name": "dev"}, {"name": "staging"}],
                "nextToken": "next"
            })))
            .mount(&server)
            .await;

        let environments = assert_ok!(client_for(&server).list_environments("acme").await);
        let names: Vec<&str> = environments.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["dev", "staging", "prod"]);
    }

    #[tokio::test]
    async fn test_list_updates_requests_page() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/stacks/org1/proj1/dev/updates"))
            .and(query_param("page", "1"))
            .and(query_param("pageSize", "100"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "updates": [{
                    "kind": "update",
                    "result": "succeeded",
                    "startTime": 1000,
                    "endTime": 1060,
                    "version": 2,
                    "resourceChanges": {"create": 3}
                }]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let key = StackKey::new("org1", "proj1", "dev");
        let updates = assert_ok!(client_for(&server).list_updates(&key, 1, 100).await);
        assert_eq!(updates.len(), 1);
        assert_eq!(updates[0].version, 2);
        assert_eq!(updates[0].resource_changes.get("create"), Some(&3));
    }

    #[tokio::test]
    async fn test_get_policy_results_metadata() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/orgs/acme/policyresults/metadata"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "policyTotalCount": 12,
                "policyWithIssuesCount": 3,
                "resourcesTotalCount": 400,
                "resourcesWithIssuesCount": 17
            })))
            .mount(&server)
            .await;

        let metadata = assert_ok!(client_for(&server).get_policy_results_metadata("acme").await);
        assert_eq!(
            metadata,
            PolicyResultsMetadata {
                policy_total_count: 12,
                policy_with_issues_count: 3,
                resources_total_count: 400,
                resources_with_issues_count: 17,
            }
        );
    }

    #[tokio::test]
    async fn test_list_policy_violations_reads_a_single_page() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/orgs/acme/policyresults/violationsv2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "policyViolations": [
                    {"policyName": "no-public-buckets", "level": "mandatory", "kind": "audit"},
                    {"policyName": "tagging", "level": "advisory", "kind": "audit"}
                ],
                "continuationToken": "ignored"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let violations = assert_ok!(client_for(&server).list_policy_violations("acme").await);
        let levels: Vec<&str> = violations.iter().map(|v| v.level.as_str()).collect();
        assert_eq!(levels, vec!["mandatory", "advisory"]);
    }

    #[tokio::test]
    async fn test_unexpected_status_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/stacks/org1/proj1/dev/resources/count"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let key = StackKey::new("org1", "proj1", "dev");
        let err = assert_err!(client_for(&server).get_resource_count(&key).await);
        match err {
            ApiError::UnexpectedStatus { status, .. } => assert_eq!(status.as_u16(), 503),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_malformed_body_is_a_decode_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/orgs/acme/deployments"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let err = assert_err!(client_for(&server).list_org_deployments("acme").await);
        assert!(matches!(err, ApiError::Decode { .. }), "unexpected error: {err:?}");
    }

    #[test]
    fn test_path_segments_are_encoded() {
        let client = assert_ok!(PulumiClient::new(
            Url::parse("https://api.pulumi.com").expect("valid url"),
            "token",
            Duration::from_secs(1),
        ));
        let url = assert_ok!(client.endpoint(&["api", "orgs", "my org", "teams"], &[]));
        assert_eq!(url.as_str(), "https://api.pulumi.com/api/orgs/my%20org/teams");
    }
}
