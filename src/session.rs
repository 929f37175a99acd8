use std::sync::Arc;
use std::time::Duration;

use log::{debug, info};
use reqwest::blocking::Client;
use reqwest::cookie::{CookieStore, Jar};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, USER_AGENT};
use reqwest::StatusCode;
use scraper::{Html, Selector};
use url::Url;

use crate::config::Config;
use crate::error::{AuthError, TransportError};

const LOGIN_PAGE_PATH: &str = "/uas/login";
const LOGIN_SUBMIT_PATH: &str = "/uas/login-submit";
const CSRF_COOKIE: &str = "JSESSIONID";
const API_ACCEPT: &str = "application/vnd.linkedin.normalized+json+2.1";
const LI_TRACK: &str = r#"{"clientVersion":"1.5.*","osName":"web","timezoneOffset":-6,"deviceFormFactor":"DESKTOP","mpName":"voyager-web"}"#;
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Credentials {
            username: username.into(),
            password: password.into(),
        }
    }
}

/// Signed access to the API. Everything above the login layer talks through this.
pub trait ApiClient: Send + Sync {
    /// GET `path?query` with the session's cookies and anti-forgery headers.
    fn signed_get(&self, path: &str, query: &str) -> Result<Vec<u8>, TransportError>;

    /// Short name for log lines, usually the account.
    fn label(&self) -> &str;
}

/// An authenticated account: HTTP client plus its cookie jar.
pub struct Session {
    username: String,
    client: Client,
    jar: Arc<Jar>,
    base_url: String,
    cookie_url: Url,
    user_agent: String,
}

/// Logs in with `credentials`. Verification challenges are reported, never retried.
pub fn authenticate(credentials: &Credentials, config: &Config) -> Result<Session, AuthError> {
    let username = credentials.username.clone();
    let transport = |source: reqwest::Error| AuthError::Transport {
        username: username.clone(),
        source,
    };

    let base_url = config.base_url.trim_end_matches('/').to_string();
    let login_page = format!("{}{}", base_url, LOGIN_PAGE_PATH);
    let cookie_url = Url::parse(&login_page).map_err(|e| AuthError::InvalidUrl(format!("{}: {}", login_page, e)))?;

    let jar = Arc::new(Jar::default());
    let client = Client::builder()
        .timeout(REQUEST_TIMEOUT)
        .cookie_provider(Arc::clone(&jar))
        .build()
        .map_err(transport)?;

    // 1. Login page hands out the initial cookies and hidden form inputs
    let html = client
        .get(&login_page)
        .header(USER_AGENT, &config.user_agent)
        .send()
        .and_then(|r| r.text())
        .map_err(transport)?;

    let mut form = login_form_fields(&html);
    set_field(&mut form, "session_key", &credentials.username);
    set_field(&mut form, "session_password", &credentials.password);

    // 2. Submit
    let html = client
        .post(format!("{}{}", base_url, LOGIN_SUBMIT_PATH))
        .header(USER_AGENT, &config.user_agent)
        .form(&form)
        .send()
        .and_then(|r| r.text())
        .map_err(transport)?;

    // 3. The landing page title tells us how it went
    check_login_title(&page_title(&html), &credentials.username)?;
    info!("{} Logged in successfully!", credentials.username);

    Ok(Session {
        username: credentials.username.clone(),
        client,
        jar,
        base_url,
        cookie_url,
        user_agent: config.user_agent.clone(),
    })
}

impl Session {
    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn csrf_token(&self) -> String {
        self.jar
            .cookies(&self.cookie_url)
            .and_then(|h| h.to_str().ok().and_then(csrf_from_cookie_header))
            .unwrap_or_default()
    }

    fn api_headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        if let Ok(v) = HeaderValue::from_str(&self.csrf_token()) {
            headers.insert("csrf-token", v);
        }
        if let Ok(v) = HeaderValue::from_str(&self.user_agent) {
            headers.insert(USER_AGENT, v);
        }
        headers.insert(ACCEPT, HeaderValue::from_static(API_ACCEPT));
        headers.insert("x-restli-protocol-version", HeaderValue::from_static("2.0.0"));
        headers.insert("x-li-lang", HeaderValue::from_static("en_US"));
        headers.insert("x-li-track", HeaderValue::from_static(LI_TRACK));
        headers
    }
}

impl ApiClient for Session {
    fn signed_get(&self, path: &str, query: &str) -> Result<Vec<u8>, TransportError> {
        let url = format!("{}{}?{}", self.base_url, path, query);
        debug!("{} GET {}", self.username, url);

        let resp = self.client.get(&url).headers(self.api_headers()).send()?;
        let status = resp.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(TransportError::SessionRejected(status.as_u16()));
        }
        if !status.is_success() {
            return Err(TransportError::Status(status.as_u16()));
        }
        Ok(resp.bytes()?.to_vec())
    }

    fn label(&self) -> &str {
        &self.username
    }
}

/// Picks the anti-forgery token out of a `Cookie:` header value.
pub fn csrf_from_cookie_header(header: &str) -> Option<String> {
    header
        .split(';')
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == CSRF_COOKIE)
        .map(|(_, value)| value.trim_matches('"').to_string())
}

/// Every named `<input>` on the login page with its preset value.
pub fn login_form_fields(html: &str) -> Vec<(String, String)> {
    let document = Html::parse_document(html);
    let Ok(selector) = Selector::parse("input") else {
        return Vec::new();
    };

    document
        .select(&selector)
        .filter_map(|input| {
            let name = input.value().attr("name")?;
            let value = input.value().attr("value").unwrap_or_default();
            Some((name.to_string(), value.to_string()))
        })
        .collect()
}

pub fn page_title(html: &str) -> String {
    let document = Html::parse_document(html);
    let Ok(selector) = Selector::parse("title") else {
        return String::new();
    };
    document
        .select(&selector)
        .next()
        .map(|t| t.text().collect::<String>().trim().to_string())
        .unwrap_or_default()
}

pub fn check_login_title(title: &str, username: &str) -> Result<(), AuthError> {
    if title.contains("Security Verification") {
        return Err(AuthError::Challenge {
            username: username.to_string(),
        });
    }
    if title != "LinkedIn" {
        return Err(AuthError::InvalidCredentials {
            username: username.to_string(),
        });
    }
    Ok(())
}

fn set_field(form: &mut Vec<(String, String)>, name: &str, value: &str) {
    form.retain(|(n, _)| n != name);
    form.push((name.to_string(), value.to_string()));
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{BufRead, BufReader, Read, Write};
    use std::net::{TcpListener, TcpStream};
    use std::sync::Mutex;
    use std::thread;

    #[derive(Debug, Clone)]
    struct SeenRequest {
        target: String,
        headers: Vec<(String, String)>,
        body: String,
    }

    impl SeenRequest {
        fn header(&self, name: &str) -> Option<&str> {
            self.headers
                .iter()
                .find(|(n, _)| n.eq_ignore_ascii_case(name))
                .map(|(_, v)| v.as_str())
        }
    }

    /// Canned site: login page, login submit keyed on the password, and a few API paths.
    fn route(method: &str, path: &str, body: &str) -> (u16, &'static str, String) {
        match (method, path) {
            ("GET", "/uas/login") => (
                200,
                "Set-Cookie: JSESSIONID=\"ajax:1\"; Path=/\r\n",
                r#"<html><head><title>Sign In</title></head><body><form>
                    <input type="hidden" name="loginCsrfParam" value="abc-123">
                    <input type="text" name="session_key">
                    <input type="password" name="session_password">
                </form></body></html>"#
                    .to_string(),
            ),
            ("POST", "/uas/login-submit") => {
                let title = if body.contains("session_password=good") {
                    "LinkedIn"
                } else if body.contains("session_password=captcha") {
                    "Security Verification | LinkedIn"
                } else {
                    "LinkedIn Login, Sign in | LinkedIn"
                };
                (200, "", format!("<html><head><title>{}</title></head></html>", title))
            }
            ("GET", "/voyager/api/ok") => (200, "", "{}".to_string()),
            ("GET", "/voyager/api/unauthorized") => (401, "", String::new()),
            ("GET", "/voyager/api/forbidden") => (403, "", String::new()),
            _ => (500, "", String::new()),
        }
    }

    fn handle(stream: TcpStream, seen: &Mutex<Vec<SeenRequest>>) {
        let mut reader = BufReader::new(stream.try_clone().unwrap());
        let mut request_line = String::new();
        reader.read_line(&mut request_line).unwrap();
        let mut parts = request_line.split_whitespace();
        let method = parts.next().unwrap_or_default().to_string();
        let target = parts.next().unwrap_or_default().to_string();

        let mut headers = Vec::new();
        loop {
            let mut line = String::new();
            reader.read_line(&mut line).unwrap();
            let line = line.trim_end();
            if line.is_empty() {
                break;
            }
            if let Some((name, value)) = line.split_once(':') {
                headers.push((name.trim().to_lowercase(), value.trim().to_string()));
            }
        }

        let length = headers
            .iter()
            .find(|(n, _)| n == "content-length")
            .and_then(|(_, v)| v.parse::<usize>().ok())
            .unwrap_or(0);
        let mut body = vec![0u8; length];
        reader.read_exact(&mut body).unwrap();
        let body = String::from_utf8_lossy(&body).to_string();

        let path = target.split('?').next().unwrap_or_default().to_string();
        let (status, extra_headers, reply) = route(&method, &path, &body);
        seen.lock().unwrap().push(SeenRequest { target, headers, body });

        let mut stream = stream;
        write!(
            stream,
            "HTTP/1.1 {} Canned\r\nContent-Type: text/html\r\nContent-Length: {}\r\nConnection: close\r\n{}\r\n{}",
            status,
            reply.len(),
            extra_headers,
            reply
        )
        .unwrap();
        stream.flush().unwrap();
    }

    /// Serves `route` on an ephemeral local port and records every request.
    fn start_site() -> (Config, Arc<Mutex<Vec<SeenRequest>>>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let log = Arc::clone(&seen);
        thread::spawn(move || {
            for stream in listener.incoming().flatten() {
                handle(stream, &log);
            }
        });

        let config = Config {
            base_url: format!("http://{}", addr),
            ..Config::default()
        };
        (config, seen)
    }

    #[test]
    fn test_login_and_signed_get_carry_csrf_token() {
        let (config, seen) = start_site();
        let session = authenticate(&Credentials::new("ada@example.com", "good"), &config).unwrap();
        assert_eq!(session.username(), "ada@example.com");
        assert_eq!(session.csrf_token(), "ajax:1");

        let body = session.signed_get("/voyager/api/ok", "q=people&start=0").unwrap();
        assert_eq!(body, b"{}");

        let requests = seen.lock().unwrap().clone();
        assert_eq!(requests.len(), 3);

        let submit = &requests[1];
        assert_eq!(submit.target, "/uas/login-submit");
        assert!(submit.body.contains("loginCsrfParam=abc-123"));
        assert!(submit.body.contains("session_key=ada%40example.com"));
        assert!(submit.body.contains("session_password=good"));

        let api = &requests[2];
        assert_eq!(api.target, "/voyager/api/ok?q=people&start=0");
        assert_eq!(api.header("csrf-token"), Some("ajax:1"));
        assert_eq!(api.header("accept"), Some(API_ACCEPT));
        assert_eq!(api.header("x-restli-protocol-version"), Some("2.0.0"));
        assert_eq!(api.header("x-li-lang"), Some("en_US"));
        assert_eq!(api.header("user-agent"), Some(config.user_agent.as_str()));
        assert!(api.header("cookie").is_some_and(|c| c.contains("JSESSIONID")));
    }

    #[test]
    fn test_signed_get_status_mapping() {
        let (config, _) = start_site();
        let session = authenticate(&Credentials::new("ada@example.com", "good"), &config).unwrap();

        let err = session.signed_get("/voyager/api/unauthorized", "").unwrap_err();
        assert!(matches!(err, TransportError::SessionRejected(401)));
        assert!(err.is_fatal());

        let err = session.signed_get("/voyager/api/forbidden", "").unwrap_err();
        assert!(matches!(err, TransportError::SessionRejected(403)));

        let err = session.signed_get("/voyager/api/missing", "").unwrap_err();
        assert!(matches!(err, TransportError::Status(500)));
        assert!(!err.is_fatal());
    }

    #[test]
    fn test_authenticate_reports_challenge_and_bad_password() {
        let (config, _) = start_site();

        let err = authenticate(&Credentials::new("ada@example.com", "captcha"), &config).err();
        assert!(matches!(err, Some(AuthError::Challenge { username }) if username == "ada@example.com"));

        let err = authenticate(&Credentials::new("ada@example.com", "wrong"), &config).err();
        assert!(matches!(err, Some(AuthError::InvalidCredentials { .. })));
    }

    #[test]
    fn test_unreachable_site_is_transport_error() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        let config = Config {
            base_url: format!("http://{}", addr),
            ..Config::default()
        };
        let err = authenticate(&Credentials::new("ada@example.com", "good"), &config).err();
        assert!(matches!(err, Some(AuthError::Transport { .. })));
    }

    #[test]
    fn test_csrf_from_cookie_header() {
        let header = r#"bcookie="v=2&abc"; JSESSIONID="ajax:123456789"; lang=v=2&lang=en-us"#;
        assert_eq!(csrf_from_cookie_header(header).as_deref(), Some("ajax:123456789"));
        assert_eq!(csrf_from_cookie_header("a=b; c=d"), None);
        assert_eq!(csrf_from_cookie_header(""), None);
    }

    #[test]
    fn test_login_form_fields() {
        let html = r#"<html><body><form>
            <input type="hidden" name="loginCsrfParam" value="abc-123">
            <input type="text" name="session_key">
            <input type="submit" value="Sign in">
        </form></body></html>"#;
        let fields = login_form_fields(html);
        assert_eq!(
            fields,
            vec![
                ("loginCsrfParam".to_string(), "abc-123".to_string()),
                ("session_key".to_string(), String::new()),
            ]
        );
    }

    #[test]
    fn test_set_field_replaces_existing() {
        let mut form = vec![("session_key".to_string(), String::new())];
        set_field(&mut form, "session_key", "me@example.com");
        assert_eq!(form, vec![("session_key".to_string(), "me@example.com".to_string())]);
    }

    #[test]
    fn test_login_title_classification() {
        assert!(check_login_title("LinkedIn", "u").is_ok());
        assert!(matches!(
            check_login_title("Security Verification | LinkedIn", "u"),
            Err(AuthError::Challenge { .. })
        ));
        assert!(matches!(
            check_login_title("LinkedIn Login, Sign in | LinkedIn", "u"),
            Err(AuthError::InvalidCredentials { .. })
        ));
    }

    #[test]
    fn test_page_title() {
        assert_eq!(page_title("<html><head><title> LinkedIn </title></head></html>"), "LinkedIn");
        assert_eq!(page_title("<p>no title</p>"), "");
    }
}
