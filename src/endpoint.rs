//! Maps the page origin onto the WebSocket endpoint.

use url::Url;

use crate::error::ClientError;

pub const DEFAULT_PATH: &str = "/ws";

/// `https://host` becomes `wss://host/ws`, `http://host:8000` becomes `ws://host:8000/ws`.
pub fn derive_ws_url(origin: &Url, path: &str) -> Result<Url, ClientError> {
    let scheme = match origin.scheme() {
        "https" => "wss",
        "http" => "ws",
        other => return Err(ClientError::UnsupportedScheme(other.to_string())),
    };
    let host = origin
        .host_str()
        .ok_or_else(|| ClientError::MissingHost(origin.to_string()))?;

    let mut endpoint = format!("{}://{}", scheme, host);
    if let Some(port) = origin.port() {
        endpoint.push_str(&format!(":{}", port));
    }
    if !path.starts_with('/') {
        endpoint.push('/');
    }
    endpoint.push_str(path);

    // Only fails on a host the origin already parsed, so treat it as missing.
    Url::parse(&endpoint).map_err(|_| ClientError::MissingHost(origin.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn origin(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn secure_page_gets_secure_socket() {
        let url = derive_ws_url(&origin("https://demo.example.com"), DEFAULT_PATH).unwrap();
        assert_eq!(url.as_str(), "wss://demo.example.com/ws");
    }

    #[test]
    fn plain_page_keeps_port() {
        let url = derive_ws_url(&origin("http://localhost:8000/index.html?x=1"), DEFAULT_PATH).unwrap();
        assert_eq!(url.as_str(), "ws://localhost:8000/ws");
    }

    #[test]
    fn ipv6_host_survives() {
        let url = derive_ws_url(&origin("http://[::1]:9000"), DEFAULT_PATH).unwrap();
        assert_eq!(url.as_str(), "ws://[::1]:9000/ws");
    }

    #[test]
    fn custom_path_without_slash() {
        let url = derive_ws_url(&origin("http://localhost"), "socket").unwrap();
        assert_eq!(url.as_str(), "ws://localhost/socket");
    }

    #[test]
    fn other_schemes_are_rejected() {
        assert_matches!(
            derive_ws_url(&origin("ftp://files.example.com"), DEFAULT_PATH),
            Err(ClientError::UnsupportedScheme(s)) if s == "ftp"
        );
        assert_matches!(
            derive_ws_url(&origin("file:///tmp/page.html"), DEFAULT_PATH),
            Err(ClientError::UnsupportedScheme(_))
        );
    }
}
