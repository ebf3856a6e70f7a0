//! GitHub REST client over blocking `ureq`.

use std::sync::OnceLock;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde_json::json;
use ureq::http::Response;
use ureq::{Agent, Body};

use super::types::{
    Branch, Card, Column, Commit, Comparison, Project, PullRequest, RepoId, SearchPage,
    SearchResults, Tag,
};
use super::Hosting;
use crate::config::GithubConfig;
use crate::error::ExitError;

const USER_AGENT: &str = concat!("nxrelease/", env!("CARGO_PKG_VERSION"));
const ACCEPT_JSON: &str = "application/vnd.github+json";
// Classic projects still sit behind the inertia preview media type.
const ACCEPT_PROJECTS: &str = "application/vnd.github.inertia-preview+json";
const ACCEPT_DIFF: &str = "application/vnd.github.v3.diff";
const PER_PAGE: &str = "100";
const MAX_BODY_BYTES: u64 = 128 * 1024 * 1024;

/// Blocking GitHub client bound to one repository.
pub struct GitHubClient {
    agent: Agent,
    api_url: String,
    auth: String,
    repo: RepoId,
}

impl GitHubClient {
    pub fn new(repo: RepoId, token: &str, config: &GithubConfig) -> anyhow::Result<Self> {
        let token = token.trim();
        if token.is_empty() {
            return Err(ExitError::Config("GitHub token is empty".to_string()).into());
        }
        let agent_config = Agent::config_builder()
            .timeout_global(Some(Duration::from_secs(config.timeout_secs)))
            .http_status_as_error(false)
            .build();
        Ok(Self {
            agent: Agent::new_with_config(agent_config),
            api_url: config.api_url.trim_end_matches('/').to_string(),
            auth: format!("Bearer {token}"),
            repo,
        })
    }

    fn api_url(&self, path: &str) -> String {
        format!("{}{}", self.api_url, path)
    }

    fn repo_path(&self, rest: &str) -> String {
        format!("/repos/{}/{}{}", self.repo.owner, self.repo.name, rest)
    }

    fn get(
        &self,
        url: &str,
        query: &[(&str, &str)],
        accept: &str,
        endpoint: &str,
    ) -> anyhow::Result<Response<Body>> {
        tracing::debug!(method = "GET", url, "github request");
        let mut request = self
            .agent
            .get(url)
            .header("Authorization", self.auth.as_str())
            .header("Accept", accept)
            .header("User-Agent", USER_AGENT)
            .header("X-GitHub-Api-Version", "2022-11-28");
        for (key, value) in query {
            request = request.query(*key, *value);
        }
        let response = request.call().map_err(|e| ExitError::Transport {
            endpoint: endpoint.to_string(),
            message: e.to_string(),
        })?;
        check_status(response, endpoint)
    }

    fn post(
        &self,
        path: &str,
        accept: &str,
        body: &serde_json::Value,
    ) -> anyhow::Result<Response<Body>> {
        let url = self.api_url(path);
        tracing::debug!(method = "POST", url, "github request");
        let payload = body.to_string();
        let response = self
            .agent
            .post(&url)
            .header("Authorization", self.auth.as_str())
            .header("Accept", accept)
            .header("User-Agent", USER_AGENT)
            .header("X-GitHub-Api-Version", "2022-11-28")
            .header("Content-Type", "application/json")
            .send(payload.as_str())
            .map_err(|e| ExitError::Transport {
                endpoint: path.to_string(),
                message: e.to_string(),
            })?;
        check_status(response, path)
    }

    fn get_json<T: DeserializeOwned>(&self, path: &str, accept: &str) -> anyhow::Result<T> {
        let response = self.get(&self.api_url(path), &[], accept, path)?;
        read_json(response, path)
    }

    fn post_json<T: DeserializeOwned>(
        &self,
        path: &str,
        accept: &str,
        body: &serde_json::Value,
    ) -> anyhow::Result<T> {
        let response = self.post(path, accept, body)?;
        read_json(response, path)
    }

    /// Walk every page of a list endpoint, following `Link: rel="next"`.
    fn for_each_page(
        &self,
        path: &str,
        query: &[(&str, &str)],
        accept: &str,
        mut page: impl FnMut(String) -> anyhow::Result<()>,
    ) -> anyhow::Result<()> {
        let mut url = self.api_url(path);
        let mut query: Vec<(&str, &str)> = query.to_vec();
        query.push(("per_page", PER_PAGE));

        loop {
            let mut response = self.get(&url, &query, accept, path)?;
            let next = response
                .headers()
                .get("link")
                .and_then(|v| v.to_str().ok())
                .and_then(parse_next_link);
            page(read_text(&mut response, path)?)?;

            match next {
                Some(next_url) => {
                    // The next link already carries the query string.
                    url = next_url;
                    query.clear();
                }
                None => break,
            }
        }
        Ok(())
    }

    fn get_all<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
        accept: &str,
    ) -> anyhow::Result<Vec<T>> {
        let mut all = Vec::new();
        self.for_each_page(path, query, accept, |text| {
            let items: Vec<T> = parse_body(&text, path)?;
            all.extend(items);
            Ok(())
        })?;
        Ok(all)
    }
}

impl Hosting for GitHubClient {
    fn repo(&self) -> &RepoId {
        &self.repo
    }

    fn projects(&self) -> anyhow::Result<Vec<Project>> {
        self.get_all(&self.repo_path("/projects"), &[("state", "all")], ACCEPT_PROJECTS)
    }

    fn create_project(&self, name: &str) -> anyhow::Result<Project> {
        self.post_json(&self.repo_path("/projects"), ACCEPT_PROJECTS, &json!({ "name": name }))
    }

    fn columns(&self, project: &Project) -> anyhow::Result<Vec<Column>> {
        self.get_all(&format!("/projects/{}/columns", project.id), &[], ACCEPT_PROJECTS)
    }

    fn create_column(&self, project: &Project, name: &str) -> anyhow::Result<Column> {
        self.post_json(
            &format!("/projects/{}/columns", project.id),
            ACCEPT_PROJECTS,
            &json!({ "name": name }),
        )
    }

    fn cards(&self, column: &Column) -> anyhow::Result<Vec<Card>> {
        self.get_all(
            &format!("/projects/columns/{}/cards", column.id),
            &[("archived_state", "not_archived")],
            ACCEPT_PROJECTS,
        )
    }

    fn create_card(&self, column: &Column, pr: &PullRequest) -> anyhow::Result<Card> {
        self.post_json(
            &format!("/projects/columns/{}/cards", column.id),
            ACCEPT_PROJECTS,
            &json!({ "content_id": pr.id, "content_type": "PullRequest" }),
        )
    }

    fn move_card(&self, card: &Card, column: &Column) -> anyhow::Result<()> {
        self.post(
            &format!("/projects/columns/cards/{}/moves", card.id),
            ACCEPT_PROJECTS,
            &json!({ "position": "bottom", "column_id": column.id }),
        )?;
        Ok(())
    }

    fn search_issues(&self, query: &str) -> anyhow::Result<SearchResults> {
        let path = "/search/issues";
        let mut results = SearchResults::default();
        self.for_each_page(path, &[("q", query)], ACCEPT_JSON, |text| {
            let page: SearchPage = parse_body(&text, path)?;
            results.total_count = page.total_count;
            results.items.extend(page.items);
            Ok(())
        })?;
        Ok(results)
    }

    fn pull_request(&self, number: u64) -> anyhow::Result<PullRequest> {
        self.get_json(&self.repo_path(&format!("/pulls/{number}")), ACCEPT_JSON)
    }

    fn pull_request_diff(&self, pr: &PullRequest) -> anyhow::Result<String> {
        let path = self.repo_path(&format!("/pulls/{}", pr.number));
        let mut response = self.get(&self.api_url(&path), &[], ACCEPT_DIFF, &path)?;
        read_text(&mut response, &path)
    }

    fn branches(&self) -> anyhow::Result<Vec<Branch>> {
        self.get_all(&self.repo_path("/branches"), &[], ACCEPT_JSON)
    }

    fn compare(&self, base: &str, head: &str) -> anyhow::Result<Comparison> {
        self.get_json(&self.repo_path(&format!("/compare/{base}...{head}")), ACCEPT_JSON)
    }

    fn commit(&self, reference: &str) -> anyhow::Result<Commit> {
        self.get_json(&self.repo_path(&format!("/commits/{reference}")), ACCEPT_JSON)
    }

    fn tags(&self) -> anyhow::Result<Vec<Tag>> {
        self.get_all(&self.repo_path("/tags"), &[], ACCEPT_JSON)
    }
}

fn check_status(mut response: Response<Body>, endpoint: &str) -> anyhow::Result<Response<Body>> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let remaining = response
        .headers()
        .get("x-ratelimit-remaining")
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned);
    let body = response.body_mut().read_to_string().unwrap_or_default();
    Err(api_error(status.as_u16(), endpoint, &body, remaining.as_deref()).into())
}

/// Classify a non-success response.
fn api_error(status: u16, endpoint: &str, body: &str, ratelimit_remaining: Option<&str>) -> ExitError {
    if status == 401 {
        return ExitError::Config("GitHub rejected the token (401 Unauthorized)".to_string());
    }
    // GitHub returns errors as {"message": "..."}
    let api_message = serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v.get("message").and_then(|m| m.as_str()).map(str::to_owned));

    let message = match (status, ratelimit_remaining, api_message) {
        (429, _, _) | (403, Some("0"), _) => "rate limit exceeded".to_string(),
        (_, _, Some(msg)) => msg,
        (403, _, None) => "access denied".to_string(),
        (404, _, None) => "resource not found".to_string(),
        (_, _, None) => format!("request failed: {}", body.trim()),
    };
    ExitError::Api {
        status,
        endpoint: endpoint.to_string(),
        message,
    }
}

fn read_text(response: &mut Response<Body>, endpoint: &str) -> anyhow::Result<String> {
    response
        .body_mut()
        .with_config()
        .limit(MAX_BODY_BYTES)
        .read_to_string()
        .map_err(|e| {
            ExitError::Transport {
                endpoint: endpoint.to_string(),
                message: e.to_string(),
            }
            .into()
        })
}

fn read_json<T: DeserializeOwned>(mut response: Response<Body>, endpoint: &str) -> anyhow::Result<T> {
    let text = read_text(&mut response, endpoint)?;
    parse_body(&text, endpoint)
}

fn parse_body<T: DeserializeOwned>(text: &str, endpoint: &str) -> anyhow::Result<T> {
    serde_json::from_str(text).map_err(|e| {
        ExitError::Other(format!("unexpected response from {endpoint}: {e}")).into()
    })
}

fn re_next_link() -> &'static regex::Regex {
    static RE: OnceLock<regex::Regex> = OnceLock::new();
    RE.get_or_init(|| regex::Regex::new(r#"<([^>]+)>\s*;\s*rel="next""#).expect("valid regex"))
}

/// Extract the `rel="next"` URL from a `Link` header.
pub fn parse_next_link(header: &str) -> Option<String> {
    header
        .split(',')
        .find_map(|part| re_next_link().captures(part))
        .map(|caps| caps[1].to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::io::{BufRead, BufReader, Read, Write};
    use std::net::TcpListener;
    use std::thread::{self, JoinHandle};

    use crate::github::Label;

    /// A request as the local server saw it.
    #[derive(Debug)]
    struct Seen {
        line: String,
        headers: Vec<String>,
        body: String,
    }

    struct Reply {
        status: u16,
        link: Option<String>,
        body: String,
    }

    fn reply(status: u16, body: &str) -> Reply {
        Reply {
            status,
            link: None,
            body: body.to_string(),
        }
    }

    /// Serve `replies` in order, one connection each, on an ephemeral port.
    fn serve(listener: TcpListener, replies: Vec<Reply>) -> JoinHandle<Vec<Seen>> {
        thread::spawn(move || {
            let mut seen = Vec::new();
            for reply in replies {
                let (stream, _) = listener.accept().unwrap();
                let mut reader = BufReader::new(stream.try_clone().unwrap());

                let mut line = String::new();
                reader.read_line(&mut line).unwrap();
                let mut headers = Vec::new();
                let mut length = 0;
                loop {
                    let mut header = String::new();
                    reader.read_line(&mut header).unwrap();
                    let header = header.trim_end().to_string();
                    if header.is_empty() {
                        break;
                    }
                    if let Some((name, value)) = header.split_once(':')
                        && name.eq_ignore_ascii_case("content-length")
                    {
                        length = value.trim().parse().unwrap();
                    }
                    headers.push(header.to_ascii_lowercase());
                }
                let mut body = vec![0; length];
                reader.read_exact(&mut body).unwrap();

                let mut out = stream;
                let link = reply
                    .link
                    .map(|l| format!("Link: {l}\r\n"))
                    .unwrap_or_default();
                write!(
                    out,
                    "HTTP/1.1 {} X\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n{link}\r\n{}",
                    reply.status,
                    reply.body.len(),
                    reply.body
                )
                .unwrap();
                out.flush().unwrap();

                seen.push(Seen {
                    line: line
                        .trim_end()
                        .trim_end_matches(" HTTP/1.1")
                        .to_string(),
                    headers,
                    body: String::from_utf8(body).unwrap(),
                });
            }
            seen
        })
    }

    fn local() -> (TcpListener, GitHubClient, String) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());
        let config = GithubConfig {
            api_url: base.clone(),
            timeout_secs: 5,
            ..GithubConfig::default()
        };
        let client = GitHubClient::new("apache/nuttx".parse().unwrap(), "t0ken", &config).unwrap();
        (listener, client, base)
    }

    fn pull(number: u64) -> PullRequest {
        PullRequest {
            id: 900_000 + number,
            number,
            title: format!("PR {number}"),
            body: None,
            labels: vec![Label {
                name: "Area: Build".to_string(),
            }],
            html_url: None,
            merged_at: None,
        }
    }

    #[test]
    fn search_follows_next_link_once() {
        let (listener, client, base) = local();
        let first = Reply {
            link: Some(format!(
                "<{base}/search/issues?q=x&per_page=100&page=2>; rel=\"next\", <{base}/search/issues?q=x&per_page=100&page=2>; rel=\"last\""
            )),
            ..reply(200, r#"{"total_count": 3, "items": [{"number": 1}, {"number": 2}]}"#)
        };
        let second = reply(200, r#"{"total_count": 3, "items": [{"number": 3}]}"#);
        let server = serve(listener, vec![first, second]);

        let results = client.search_issues("repo:apache/nuttx is:pr").unwrap();
        let seen = server.join().unwrap();

        let numbers: Vec<u64> = results.items.iter().map(|hit| hit.number).collect();
        assert_eq!(numbers, vec![1, 2, 3]);
        assert_eq!(results.total_count, 3);
        assert_eq!(seen.len(), 2);
        assert!(seen[0].line.starts_with("GET /search/issues?q=repo"));
        assert!(seen[0].line.contains("per_page=100"));
        // The next link is used as is; the first page's query is not appended again.
        assert_eq!(seen[1].line, "GET /search/issues?q=x&per_page=100&page=2");
        assert!(seen[0].headers.contains(&"authorization: bearer t0ken".to_string()));
    }

    #[test]
    fn create_card_posts_pull_request_content() {
        let (listener, client, _) = local();
        let server = serve(listener, vec![reply(201, r#"{"id": 77, "content_url": "https://api.github.com/repos/apache/nuttx/issues/123", "note": null}"#)]);

        let column = Column {
            id: 5,
            name: "To-Add".to_string(),
        };
        let card = client.create_card(&column, &pull(123)).unwrap();
        let seen = server.join().unwrap();

        assert_eq!(card.id, 77);
        assert_eq!(seen[0].line, "POST /projects/columns/5/cards");
        assert!(seen[0]
            .headers
            .contains(&format!("accept: {ACCEPT_PROJECTS}")));
        let body: serde_json::Value = serde_json::from_str(&seen[0].body).unwrap();
        assert_eq!(body["content_type"], "PullRequest");
        assert_eq!(body["content_id"], 900_123);
    }

    #[test]
    fn move_card_posts_bottom_position() {
        let (listener, client, _) = local();
        let server = serve(listener, vec![reply(201, "{}")]);

        let card = Card {
            id: 77,
            content_url: None,
            note: None,
        };
        let column = Column {
            id: 9,
            name: "Added".to_string(),
        };
        client.move_card(&card, &column).unwrap();
        let seen = server.join().unwrap();

        assert_eq!(seen[0].line, "POST /projects/columns/cards/77/moves");
        let body: serde_json::Value = serde_json::from_str(&seen[0].body).unwrap();
        assert_eq!(body["position"], "bottom");
        assert_eq!(body["column_id"], 9);
    }

    #[test]
    fn error_status_becomes_api_error() {
        let (listener, client, _) = local();
        let server = serve(listener, vec![reply(404, r#"{"message": "Not Found"}"#)]);

        let err = client.pull_request(42).unwrap_err();
        let seen = server.join().unwrap();

        assert_eq!(seen[0].line, "GET /repos/apache/nuttx/pulls/42");
        match err.downcast_ref::<ExitError>() {
            Some(ExitError::Api {
                status, endpoint, ..
            }) => {
                assert_eq!(*status, 404);
                assert_eq!(endpoint, "/repos/apache/nuttx/pulls/42");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn next_link_found_among_others() {
        let header = r#"<https://api.github.com/search/issues?q=x&page=1>; rel="prev", <https://api.github.com/search/issues?q=x&page=3>; rel="next", <https://api.github.com/search/issues?q=x&page=9>; rel="last""#;
        assert_eq!(
            parse_next_link(header).as_deref(),
            Some("https://api.github.com/search/issues?q=x&page=3")
        );
    }

    #[test]
    fn no_next_link_on_last_page() {
        let header = r#"<https://api.github.com/repos/a/b/tags?page=1>; rel="first", <https://api.github.com/repos/a/b/tags?page=4>; rel="prev""#;
        assert_eq!(parse_next_link(header), None);
        assert_eq!(parse_next_link(""), None);
    }

    #[test]
    fn unauthorized_is_config_error() {
        let err = api_error(401, "/repos/a/b/projects", r#"{"message":"Bad credentials"}"#, None);
        assert!(matches!(err, ExitError::Config(_)));
    }

    #[test]
    fn rate_limit_detected_from_header() {
        let err = api_error(403, "/search/issues", r#"{"message":"API rate limit exceeded for user"}"#, Some("0"));
        match err {
            ExitError::Api { status, message, .. } => {
                assert_eq!(status, 403);
                assert_eq!(message, "rate limit exceeded");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn api_message_is_preferred() {
        let err = api_error(422, "/projects/1/columns", r#"{"message":"Validation Failed"}"#, Some("4999"));
        assert_eq!(
            err.to_string(),
            "GitHub API error (422) on /projects/1/columns: Validation Failed"
        );
    }

    #[test]
    fn not_found_without_body() {
        let err = api_error(404, "/repos/a/b/pulls/1", "", None);
        assert!(err.to_string().ends_with("resource not found"));
    }

    #[test]
    fn empty_token_rejected() {
        let repo: RepoId = "apache/nuttx".parse().unwrap();
        let err = GitHubClient::new(repo, "  ", &GithubConfig::default()).err().unwrap();
        assert!(matches!(
            err.downcast_ref::<ExitError>(),
            Some(ExitError::Config(_))
        ));
    }

    #[test]
    fn paths_are_scoped_to_repo() {
        let repo: RepoId = "apache/nuttx".parse().unwrap();
        let client = GitHubClient::new(repo, "t0ken", &GithubConfig::default()).unwrap();
        assert_eq!(client.repo_path("/pulls/42"), "/repos/apache/nuttx/pulls/42");
        assert_eq!(
            client.api_url(&client.repo_path("/tags")),
            "https://api.github.com/repos/apache/nuttx/tags"
        );
    }
}
