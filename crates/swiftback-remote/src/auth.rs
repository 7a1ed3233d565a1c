use crate::{Credentials, RemoteError};
use serde::Deserialize;
use std::io::Read;
use tracing::{debug, info};

/// Bearer token issued by the identity provider's password grant.
#[derive(Debug, Clone, Deserialize)]
pub struct BearerToken {
    pub access_token: String,
    pub refresh_token: String,
    #[serde(default)]
    pub expires_in: u64,
    pub token_type: String,
}

impl BearerToken {
    pub fn is_valid(&self) -> bool {
        !self.access_token.is_empty()
            && !self.refresh_token.is_empty()
            && !self.token_type.is_empty()
            && self.expires_in != 0
    }
}

#[derive(Debug, Deserialize)]
struct StorageGrant {
    token: String,
    endpoint: String,
}

/// Exchange login and password for storage credentials.
///
/// Two steps against the identity endpoint: a password-grant `POST
/// {auth_url}/token` yielding a bearer token, then `GET
/// {auth_url}/credentials` with that bearer yielding the storage token and
/// endpoint URL.
pub fn authenticate(auth_url: &str, login: &str, password: &str) -> Result<Credentials, RemoteError> {
    let agent = ureq::Agent::new_with_defaults();
    let auth_url = auth_url.trim_end_matches('/');

    debug!("requesting bearer token from {auth_url}");
    let token_url = format!("{auth_url}/token");
    let resp = agent
        .post(&token_url)
        .send_form([
            ("grant_type", "password"),
            ("login", login),
            ("password", password),
        ])
        .map_err(|e| RemoteError::Auth(format!("token request failed: {e}")))?;
    let token: BearerToken = parse_json(resp)?;
    if !token.is_valid() {
        return Err(RemoteError::Auth("incomplete token response".to_owned()));
    }

    let grant_url = format!("{auth_url}/credentials");
    let resp = agent
        .get(&grant_url)
        .header("Authorization", &format!("Bearer {}", token.access_token))
        .call()
        .map_err(|e| RemoteError::Auth(format!("credentials request failed: {e}")))?;
    let grant: StorageGrant = parse_json(resp)?;
    if grant.token.is_empty() || grant.endpoint.is_empty() {
        return Err(RemoteError::Auth("incomplete storage grant".to_owned()));
    }

    info!("authenticated, storage endpoint {}", grant.endpoint);
    Ok(Credentials {
        token: grant.token,
        endpoint: grant.endpoint.trim_end_matches('/').to_owned(),
    })
}

fn parse_json<T: for<'de> Deserialize<'de>>(
    resp: ureq::http::Response<ureq::Body>,
) -> Result<T, RemoteError> {
    let mut body = String::new();
    resp.into_body()
        .into_reader()
        .read_to_string(&mut body)
        .map_err(|e| RemoteError::Auth(e.to_string()))?;
    serde_json::from_str(&body).map_err(|e| RemoteError::Auth(format!("invalid response: {e}")))
}
