//! HTTPS server on 127.0.0.1 that requires a client certificate and answers
//! with canned SOAP documents.

use std::{
    net::SocketAddr,
    sync::{Arc, Mutex},
};

use anyhow::Context;
use rustls::{server::WebPkiClientVerifier, RootCertStore, ServerConfig, SupportedCipherSuite};
use tokio::{
    io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt},
    net::TcpListener,
    task::JoinHandle,
};
use tokio_rustls::TlsAcceptor;
use url::Url;

use crate::tls::support::TestPki;

pub const LOOPBACK_HOST: &str = "127.0.0.1";

pub const DESCRIPTOR: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<definitions xmlns="http://schemas.xmlsoap.org/wsdl/" name="RpService">
  <portType name="RpServicePortType">
    <operation name="Authenticate"/>
    <operation name="Sign"/>
    <operation name="Collect"/>
  </portType>
</definitions>"#;

pub const AUTHENTICATE_RESPONSE: &str = r#"<S:Envelope xmlns:S="http://schemas.xmlsoap.org/soap/envelope/">
  <S:Body>
    <ns2:AuthenticateResponse xmlns:ns2="http://bankid.com/RpService/v4.0.0/types/">
      <orderRef>131daac9-16c6-4618-beb0-365768f37288</orderRef>
      <autoStartToken>7c40b5c9-fa74-49cf-b98c-bfe651f9a7c6</autoStartToken>
    </ns2:AuthenticateResponse>
  </S:Body>
</S:Envelope>"#;

/// What the server observed on a completed handshake.
#[derive(Debug, Clone)]
pub struct AcceptedSession {
    pub client_certificates: usize,
    pub cipher_suite: Option<SupportedCipherSuite>,
}

pub struct LoopbackServer {
    addr: SocketAddr,
    sessions: Arc<Mutex<Vec<AcceptedSession>>>,
    task: JoinHandle<()>,
}

impl LoopbackServer {
    /// Serve a chain issued by `server_pki`, accepting only clients whose
    /// certificate chains to `client_pki`'s CA.
    pub async fn start(server_pki: &TestPki, client_pki: &TestPki) -> anyhow::Result<Self> {
        let (chain, key) = server_pki.server_chain(LOOPBACK_HOST)?;

        let mut client_roots = RootCertStore::empty();
        client_roots.add(client_pki.ca_cert.der().clone()).context("client ca")?;

        let provider = Arc::new(rustls::crypto::ring::default_provider());
        let verifier =
            WebPkiClientVerifier::builder_with_provider(Arc::new(client_roots), provider.clone())
                .build()
                .context("client verifier")?;
        let config = ServerConfig::builder_with_provider(provider)
            .with_safe_default_protocol_versions()
            .context("protocol versions")?
            .with_client_cert_verifier(verifier)
            .with_single_cert(chain, key)
            .context("server certificate")?;

        let listener = TcpListener::bind((LOOPBACK_HOST, 0)).await.context("bind")?;
        let addr = listener.local_addr().context("local addr")?;
        let acceptor = TlsAcceptor::from(Arc::new(config));
        let sessions = Arc::new(Mutex::new(Vec::new()));

        let recorded = sessions.clone();
        let task = tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                let acceptor = acceptor.clone();
                let recorded = recorded.clone();
                tokio::spawn(async move {
                    let Ok(mut tls) = acceptor.accept(stream).await else {
                        return;
                    };
                    let (_, connection) = tls.get_ref();
                    recorded.lock().unwrap().push(AcceptedSession {
                        client_certificates: connection.peer_certificates().map_or(0, <[_]>::len),
                        cipher_suite: connection.negotiated_cipher_suite(),
                    });
                    let _ = answer(&mut tls).await;
                });
            }
        });

        Ok(Self { addr, sessions, task })
    }

    pub fn endpoint(&self) -> Url {
        Url::parse(&format!("https://{}/rp/v4", self.addr)).unwrap()
    }

    pub fn descriptor_url(&self) -> Url {
        Url::parse(&format!("https://{}/rp/v4?wsdl", self.addr)).unwrap()
    }

    pub fn sessions(&self) -> Vec<AcceptedSession> {
        self.sessions.lock().unwrap().clone()
    }
}

impl Drop for LoopbackServer {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Read one HTTP/1.1 request and reply with the descriptor for GET and an
/// authenticate answer for anything else.
async fn answer<S>(stream: &mut S) -> std::io::Result<()>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let mut request = Vec::new();
    let mut chunk = [0u8; 4096];
    let header_end = loop {
        let read = stream.read(&mut chunk).await?;
        if read == 0 {
            return Ok(());
        }
        request.extend_from_slice(&chunk[..read]);
        if let Some(pos) = request.windows(4).position(|window| window == b"\r\n\r\n") {
            break pos + 4;
        }
    };

    let head = String::from_utf8_lossy(&request[..header_end]).into_owned();
    let content_length = head
        .lines()
        .filter_map(|line| line.split_once(':'))
        .find(|(name, _)| name.trim().eq_ignore_ascii_case("content-length"))
        .and_then(|(_, value)| value.trim().parse::<usize>().ok())
        .unwrap_or(0);
    while request.len() < header_end + content_length {
        let read = stream.read(&mut chunk).await?;
        if read == 0 {
            break;
        }
        request.extend_from_slice(&chunk[..read]);
    }

    let body = if head.starts_with("GET ") { DESCRIPTOR } else { AUTHENTICATE_RESPONSE };
    let response = format!(
        "HTTP/1.1 200 OK\r\nContent-Type: text/xml; charset=utf-8\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        body.len(),
        body
    );
    stream.write_all(response.as_bytes()).await?;
    stream.shutdown().await
}
