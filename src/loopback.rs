//! Installed-app consent over a loopback redirect listener.

use async_trait::async_trait;
use base64::Engine;
use rand::distributions::Alphanumeric;
use rand::Rng;
use sha2::{Digest, Sha256};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, info};
use url::Url;

use crate::auth::{AuthorizationGrant, ConsentFlow};
use crate::error::AuthError;
use crate::models::InstalledAppSecrets;

const SUCCESS_PAGE: &str =
    "The authentication flow has completed. You may close this window.";

/// PKCE verifier/challenge pair (RFC 7636, S256).
#[derive(Debug, Clone)]
pub struct Pkce {
    pub verifier: String,
    pub challenge: String,
}

impl Pkce {
    pub fn generate() -> Self {
        Self::from_verifier(random_string(64))
    }

    pub fn from_verifier(verifier: String) -> Self {
        let hash = Sha256::digest(verifier.as_bytes());
        let challenge = base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(hash);
        Self {
            verifier,
            challenge,
        }
    }
}

fn random_string(len: usize) -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}

/// Build the consent URL the user has to open.
pub fn authorization_url(
    secrets: &InstalledAppSecrets,
    redirect_uri: &str,
    scopes: &[String],
    state: &str,
    pkce: &Pkce,
) -> Result<Url, AuthError> {
    let scope = scopes.join(" ");
    Url::parse_with_params(
        &secrets.auth_uri,
        &[
            ("response_type", "code"),
            ("client_id", secrets.client_id.as_str()),
            ("redirect_uri", redirect_uri),
            ("scope", scope.as_str()),
            ("state", state),
            ("code_challenge", pkce.challenge.as_str()),
            ("code_challenge_method", "S256"),
            ("access_type", "offline"),
        ],
    )
    .map_err(|e| AuthError::InvalidAuthUri(format!("{}: {}", secrets.auth_uri, e)))
}

/// Consent flow that prints the consent URL and waits for the browser to
/// be redirected to a local listener.
#[derive(Debug, Clone)]
pub struct LoopbackFlow {
    host: String,
    port: u16,
}

impl LoopbackFlow {
    /// Listen on 127.0.0.1 with an OS-assigned port.
    pub fn new() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 0,
        }
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub async fn bind(&self) -> Result<LoopbackListener, AuthError> {
        let listener = TcpListener::bind((self.host.as_str(), self.port))
            .await
            .map_err(AuthError::ListenerBind)?;
        let port = listener.local_addr().map_err(AuthError::ListenerBind)?.port();
        let redirect_uri = format!("http://{}:{}/", self.host, port);
        debug!(%redirect_uri, "redirect listener bound");

        Ok(LoopbackListener {
            listener,
            redirect_uri,
        })
    }
}

impl Default for LoopbackFlow {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ConsentFlow for LoopbackFlow {
    async fn authorize(
        &self,
        secrets: &InstalledAppSecrets,
        scopes: &[String],
    ) -> Result<AuthorizationGrant, AuthError> {
        let listener = self.bind().await?;
        let redirect_uri = listener.redirect_uri().to_string();
        let state = random_string(30);
        let pkce = Pkce::generate();

        let url = authorization_url(secrets, &redirect_uri, scopes, &state, &pkce)?;
        eprintln!(
            "Please visit this URL to authorize this application: {}",
            url
        );

        let code = listener.wait_for_code(&state).await?;
        info!("authorization code received");

        Ok(AuthorizationGrant {
            code,
            redirect_uri,
            code_verifier: Some(pkce.verifier),
        })
    }
}

/// Bound redirect listener, waiting for a single authorization callback.
pub struct LoopbackListener {
    listener: TcpListener,
    redirect_uri: String,
}

impl LoopbackListener {
    pub fn redirect_uri(&self) -> &str {
        &self.redirect_uri
    }

    /// Serve redirect requests until one carries a code or an error.
    ///
    /// Requests with neither (favicon probes and the like) get a 404 and
    /// the listener keeps waiting. So does a connection that fails mid-read.
    pub async fn wait_for_code(self, expected_state: &str) -> Result<String, AuthError> {
        loop {
            let (stream, peer) = self.listener.accept().await.map_err(AuthError::Listener)?;
            match self.handle(stream, expected_state).await {
                Ok(Some(outcome)) => return outcome,
                Ok(None) => {}
                Err(e) => debug!(%peer, error = %e, "dropping redirect connection"),
            }
        }
    }

    async fn handle(
        &self,
        mut stream: TcpStream,
        expected_state: &str,
    ) -> Result<Option<Result<String, AuthError>>, AuthError> {
        let target = read_request_target(&mut stream).await?;
        let callback = self.parse_callback(&target);

        let outcome = match callback {
            Some(Callback { error: Some(error), .. }) => {
                Err(AuthError::ConsentDenied(error))
            }
            Some(Callback {
                code: Some(code),
                state,
                ..
            }) => {
                if state.as_deref() == Some(expected_state) {
                    Ok(code)
                } else {
                    Err(AuthError::StateMismatch)
                }
            }
            _ => {
                write_response(&mut stream, "404 Not Found", "Not found").await?;
                return Ok(None);
            }
        };

        let body = match &outcome {
            Ok(_) => SUCCESS_PAGE.to_string(),
            Err(e) => format!("Authorization failed: {}", e),
        };
        if let Err(e) = write_response(&mut stream, "200 OK", &body).await {
            debug!(error = %e, "browser went away before the reply");
        }
        Ok(Some(outcome))
    }

    fn parse_callback(&self, target: &str) -> Option<Callback> {
        let url = Url::parse(&self.redirect_uri).ok()?.join(target).ok()?;
        let mut callback = Callback::default();
        for (key, value) in url.query_pairs() {
            match key.as_ref() {
                "code" => callback.code = Some(value.into_owned()),
                "state" => callback.state = Some(value.into_owned()),
                "error" => callback.error = Some(value.into_owned()),
                _ => {}
            }
        }
        Some(callback)
    }
}

#[derive(Debug, Default)]
struct Callback {
    code: Option<String>,
    state: Option<String>,
    error: Option<String>,
}

/// Read the request line and drain the headers, returning the target.
async fn read_request_target(stream: &mut TcpStream) -> Result<String, AuthError> {
    let mut reader = BufReader::new(stream);
    let mut request_line = String::new();
    reader
        .read_line(&mut request_line)
        .await
        .map_err(AuthError::Listener)?;

    loop {
        let mut header = String::new();
        let read = reader
            .read_line(&mut header)
            .await
            .map_err(AuthError::Listener)?;
        if read == 0 || header == "\r\n" || header == "\n" {
            break;
        }
    }

    // GET /?code=...&state=... HTTP/1.1
    Ok(request_line
        .split_whitespace()
        .nth(1)
        .unwrap_or("/")
        .to_string())
}

async fn write_response(stream: &mut TcpStream, status: &str, body: &str) -> Result<(), AuthError> {
    let response = format!(
        "HTTP/1.1 {}\r\nContent-Type: text/plain; charset=utf-8\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        status,
        body.len(),
        body
    );
    stream
        .write_all(response.as_bytes())
        .await
        .map_err(AuthError::Listener)?;
    stream.flush().await.map_err(AuthError::Listener)
}
