//! NETCONF session over the SSH `netconf` subsystem.

use std::time::Duration;

use log::{debug, info, trace};
use quick_xml::Reader;
use quick_xml::events::Event;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use super::framing::{FrameDecoder, Framing, encode};
use super::reply::{BASE_1_1, RpcReply, ServerHello};
use crate::error::{NetconfError, Result};
use crate::transport::{SshConfig, SshStream, SshTransport};

/// NETCONF base namespace.
pub const BASE_NAMESPACE: &str = "urn:ietf:params:xml:ns:netconf:base:1.0";

const BASE_1_0: &str = "urn:ietf:params:netconf:base:1.0";

/// Default time to wait for a reply.
pub const DEFAULT_RPC_TIMEOUT: Duration = Duration::from_secs(90);

/// A NETCONF client session.
pub struct NetconfSession<S = SshStream> {
    transport: Option<SshTransport>,
    stream: S,
    decoder: FrameDecoder,
    message_id: u64,
    timeout: Duration,
    server: ServerHello,
}

impl NetconfSession<SshStream> {
    /// Connect over SSH, start the `netconf` subsystem and exchange hellos.
    pub async fn connect(config: SshConfig) -> Result<Self> {
        let transport = SshTransport::connect(config).await?;
        let stream = transport.open_subsystem("netconf").await?;

        let mut session = Self::over_stream(stream);
        session.transport = Some(transport);
        session.hello().await?;
        Ok(session)
    }
}

impl<S> NetconfSession<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    /// Wrap an already-open subsystem stream. Call [`hello`](Self::hello)
    /// next.
    pub fn over_stream(stream: S) -> Self {
        Self {
            transport: None,
            stream,
            decoder: FrameDecoder::new(Framing::EndOfMessage),
            message_id: 0,
            timeout: DEFAULT_RPC_TIMEOUT,
            server: ServerHello::default(),
        }
    }

    /// Set the reply timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Capabilities and session id from the server hello.
    pub fn server_hello(&self) -> &ServerHello {
        &self.server
    }

    /// Current framing.
    pub fn framing(&self) -> Framing {
        self.decoder.framing()
    }

    /// Exchange hellos and pick the framing.
    pub async fn hello(&mut self) -> Result<()> {
        let hello = format!(
            r#"<?xml version="1.0" encoding="UTF-8"?><hello xmlns="{BASE_NAMESPACE}"><capabilities><capability>{BASE_1_0}</capability><capability>{BASE_1_1}</capability></capabilities></hello>"#
        );
        self.write_frame(&hello).await?;

        let message = self.receive().await?;
        self.server = ServerHello::parse(&message)?;
        debug!(
            "NETCONF session {} with {} capabilities",
            self.server.session_id.as_deref().unwrap_or("?"),
            self.server.capabilities.len()
        );

        if self.server.supports_base_1_1() {
            self.decoder.set_framing(Framing::Chunked);
        }
        Ok(())
    }

    /// Send one RPC body and return the parsed reply.
    ///
    /// The reply is returned even when it carries `rpc-error`; use
    /// [`RpcReply::into_result`] to turn that into an error.
    pub async fn rpc(&mut self, body: &str) -> Result<RpcReply> {
        self.message_id += 1;
        let request = format!(
            r#"<?xml version="1.0" encoding="UTF-8"?><rpc message-id="{}" xmlns="{BASE_NAMESPACE}">{body}</rpc>"#,
            self.message_id
        );
        self.write_frame(&request).await?;

        let reply = self.receive().await?;
        Ok(RpcReply::parse(reply)?)
    }

    /// Apply `config` to the running datastore with `edit-config`.
    ///
    /// `config` is sent as the `<config>` element; a payload whose root is
    /// anything else is wrapped in one.
    pub async fn edit_config(&mut self, config: &str) -> Result<RpcReply> {
        let config = config_element(config)?;
        let body = format!("<edit-config><target><running/></target>{config}</edit-config>");

        info!("edit-config on running");
        let reply = self.rpc(&body).await?;
        Ok(reply.into_result()?)
    }

    /// Send `close-session` and tear down the transport.
    pub async fn close(mut self) -> Result<()> {
        match self.rpc("<close-session/>").await {
            Ok(reply) if reply.is_error() => debug!("close-session refused: {reply}"),
            Ok(_) => {}
            Err(e) => debug!("close-session failed: {e}"),
        }

        let _ = self.stream.shutdown().await;
        if let Some(transport) = self.transport.take() {
            transport.disconnect().await?;
        }
        Ok(())
    }

    async fn write_frame(&mut self, message: &str) -> Result<()> {
        trace!("send: {message}");
        let framed = encode(self.decoder.framing(), message);
        self.stream
            .write_all(&framed)
            .await
            .map_err(NetconfError::Io)?;
        self.stream.flush().await.map_err(NetconfError::Io)?;
        Ok(())
    }

    async fn receive(&mut self) -> Result<String> {
        let deadline = tokio::time::Instant::now() + self.timeout;
        let mut chunk = [0u8; 8192];

        loop {
            if let Some(message) = self.decoder.decode()? {
                trace!("recv: {message}");
                return Ok(message);
            }

            let read = tokio::time::timeout_at(deadline, self.stream.read(&mut chunk))
                .await
                .map_err(|_| NetconfError::Timeout(self.timeout))?
                .map_err(NetconfError::Io)?;

            if read == 0 {
                return Err(NetconfError::Closed.into());
            }
            self.decoder.extend(&chunk[..read]);
        }
    }
}

/// Normalize an edit payload into a `<config>` element.
fn config_element(payload: &str) -> std::result::Result<String, NetconfError> {
    let mut reader = Reader::from_str(payload);

    loop {
        let position = reader.buffer_position() as usize;
        match reader.read_event() {
            Ok(Event::Decl(_) | Event::Comment(_) | Event::PI(_) | Event::DocType(_)) => {}
            Ok(Event::Text(t)) if t.iter().all(u8::is_ascii_whitespace) => {}
            Ok(Event::Start(e) | Event::Empty(e)) => {
                let body = payload[position..].trim();
                return Ok(if e.local_name().as_ref() == b"config" {
                    body.to_string()
                } else {
                    format!("<config>{body}</config>")
                });
            }
            Ok(Event::Eof) => {
                return Err(NetconfError::InvalidPayload("no root element".into()));
            }
            Ok(_) => {
                return Err(NetconfError::InvalidPayload(
                    "text before the root element".into(),
                ));
            }
            Err(e) => return Err(NetconfError::InvalidPayload(e.to_string())),
        }
    }
}
