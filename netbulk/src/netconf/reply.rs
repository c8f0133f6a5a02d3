//! Parsing of server hellos and rpc-replies.

use quick_xml::Reader;
use quick_xml::events::Event;

use crate::error::NetconfError;

/// Capability URN for base:1.1 (chunked framing).
pub const BASE_1_1: &str = "urn:ietf:params:netconf:base:1.1";

/// What the server said in its hello.
#[derive(Debug, Clone, Default)]
pub struct ServerHello {
    /// Advertised capability URNs.
    pub capabilities: Vec<String>,

    /// Session identifier assigned by the server.
    pub session_id: Option<String>,
}

impl ServerHello {
    /// Parse a `<hello>` message.
    pub fn parse(message: &str) -> Result<Self, NetconfError> {
        let mut hello = ServerHello::default();
        let mut path: Vec<String> = Vec::new();
        let mut saw_root = false;
        let mut reader = Reader::from_str(message);

        loop {
            match reader.read_event().map_err(malformed)? {
                Event::Start(e) => {
                    let name = local_name(e.local_name().as_ref());
                    if path.is_empty() {
                        expect_root(&name, "hello")?;
                        saw_root = true;
                    }
                    path.push(name);
                }
                Event::Empty(e) if path.is_empty() => {
                    expect_root(&local_name(e.local_name().as_ref()), "hello")?;
                    saw_root = true;
                }
                Event::Text(t) => {
                    let text = t.unescape().map_err(malformed)?;
                    let text = text.trim();
                    match path.last().map(String::as_str) {
                        Some("capability") if !text.is_empty() => {
                            hello.capabilities.push(text.to_string());
                        }
                        Some("session-id") if !text.is_empty() => {
                            hello.session_id = Some(text.to_string());
                        }
                        _ => {}
                    }
                }
                Event::End(_) => {
                    path.pop();
                }
                Event::Eof => break,
                _ => {}
            }
        }

        if !saw_root {
            return Err(NetconfError::MalformedReply("empty hello".into()));
        }
        Ok(hello)
    }

    /// Check whether the server supports chunked framing.
    pub fn supports_base_1_1(&self) -> bool {
        self.capabilities.iter().any(|c| c == BASE_1_1)
    }
}

/// One `<rpc-error>` from a reply.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RpcErrorInfo {
    pub tag: Option<String>,
    pub severity: Option<String>,
    pub message: Option<String>,
}

impl RpcErrorInfo {
    /// Warnings do not fail the operation.
    pub fn is_warning(&self) -> bool {
        self.severity.as_deref() == Some("warning")
    }
}

impl std::fmt::Display for RpcErrorInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match (&self.tag, &self.message) {
            (Some(tag), Some(message)) => write!(f, "{tag}: {message}"),
            (None, Some(message)) => write!(f, "{message}"),
            (Some(tag), None) => write!(f, "{tag}"),
            (None, None) => write!(f, "unspecified rpc-error"),
        }
    }
}

/// Parsed `<rpc-reply>`.
#[derive(Debug, Clone)]
pub struct RpcReply {
    /// The reply exactly as received.
    pub raw: String,

    /// Whether the reply contains `<ok/>`.
    pub ok: bool,

    /// Every `<rpc-error>` in document order.
    pub errors: Vec<RpcErrorInfo>,
}

impl RpcReply {
    /// Parse an `<rpc-reply>` message.
    pub fn parse(raw: impl Into<String>) -> Result<Self, NetconfError> {
        let raw = raw.into();
        let mut ok = false;
        let mut errors = Vec::new();
        let mut current: Option<RpcErrorInfo> = None;
        let mut path: Vec<String> = Vec::new();
        let mut saw_root = false;

        let mut reader = Reader::from_str(&raw);
        loop {
            match reader.read_event().map_err(malformed)? {
                Event::Start(e) => {
                    let name = local_name(e.local_name().as_ref());
                    if path.is_empty() {
                        expect_root(&name, "rpc-reply")?;
                        saw_root = true;
                    }
                    if name == "rpc-error" {
                        current = Some(RpcErrorInfo::default());
                    }
                    path.push(name);
                }
                Event::Empty(e) => {
                    let name = local_name(e.local_name().as_ref());
                    if path.is_empty() {
                        expect_root(&name, "rpc-reply")?;
                        saw_root = true;
                    } else if name == "ok" {
                        ok = true;
                    } else if name == "rpc-error" {
                        errors.push(RpcErrorInfo::default());
                    }
                }
                Event::Text(t) => {
                    let Some(error) = current.as_mut() else {
                        continue;
                    };
                    let text = t.unescape().map_err(malformed)?.trim().to_string();
                    if text.is_empty() {
                        continue;
                    }
                    match path.last().map(String::as_str) {
                        Some("error-tag") => error.tag = Some(text),
                        Some("error-severity") => error.severity = Some(text),
                        Some("error-message") => error.message = Some(text),
                        _ => {}
                    }
                }
                Event::End(_) => {
                    if path.pop().as_deref() == Some("rpc-error") {
                        errors.extend(current.take());
                    }
                }
                Event::Eof => break,
                _ => {}
            }
        }

        if !saw_root {
            return Err(NetconfError::MalformedReply("empty reply".into()));
        }
        Ok(Self { raw, ok, errors })
    }

    /// Errors that are not mere warnings.
    pub fn failures(&self) -> impl Iterator<Item = &RpcErrorInfo> {
        self.errors.iter().filter(|e| !e.is_warning())
    }

    /// Check whether the operation failed.
    pub fn is_error(&self) -> bool {
        self.failures().next().is_some()
    }

    /// Turn a failed reply into [`NetconfError::Rpc`].
    pub fn into_result(self) -> Result<Self, NetconfError> {
        if self.is_error() {
            let message = self
                .failures()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join("; ");
            return Err(NetconfError::Rpc(message));
        }
        Ok(self)
    }
}

impl std::fmt::Display for RpcReply {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.raw)
    }
}

fn local_name(name: &[u8]) -> String {
    String::from_utf8_lossy(name).into_owned()
}

fn expect_root(name: &str, expected: &str) -> Result<(), NetconfError> {
    if name == expected {
        Ok(())
    } else {
        Err(NetconfError::MalformedReply(format!(
            "expected <{expected}>, got <{name}>"
        )))
    }
}

fn malformed(e: quick_xml::Error) -> NetconfError {
    NetconfError::MalformedReply(e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_hello() {
        let hello = ServerHello::parse(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<hello xmlns="urn:ietf:params:xml:ns:netconf:base:1.0">
  <capabilities>
    <capability>urn:ietf:params:netconf:base:1.0</capability>
    <capability>urn:ietf:params:netconf:base:1.1</capability>
  </capabilities>
  <session-id>4711</session-id>
</hello>"#,
        )
        .unwrap();

        assert_eq!(hello.capabilities.len(), 2);
        assert!(hello.supports_base_1_1());
        assert_eq!(hello.session_id.as_deref(), Some("4711"));
    }

    #[test]
    fn test_parse_ok_reply() {
        let reply = RpcReply::parse(
            r#"<nc:rpc-reply xmlns:nc="urn:ietf:params:xml:ns:netconf:base:1.0" message-id="1"><nc:ok/></nc:rpc-reply>"#,
        )
        .unwrap();
        assert!(reply.ok);
        assert!(!reply.is_error());
        assert!(reply.into_result().is_ok());
    }

    #[test]
    fn test_parse_error_reply() {
        let reply = RpcReply::parse(
            r#"<rpc-reply message-id="2" xmlns="urn:ietf:params:xml:ns:netconf:base:1.0">
  <rpc-error>
    <error-type>application</error-type>
    <error-tag>invalid-value</error-tag>
    <error-severity>error</error-severity>
    <error-message>MTU out of range</error-message>
  </rpc-error>
  <rpc-error>
    <error-tag>operation-failed</error-tag>
    <error-severity>warning</error-severity>
  </rpc-error>
</rpc-reply>"#,
        )
        .unwrap();

        assert_eq!(reply.errors.len(), 2);
        assert!(reply.is_error());
        match reply.into_result() {
            Err(NetconfError::Rpc(message)) => {
                assert_eq!(message, "invalid-value: MTU out of range");
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_reject_wrong_root() {
        assert!(matches!(
            RpcReply::parse("<hello/>"),
            Err(NetconfError::MalformedReply(_))
        ));
        assert!(matches!(
            RpcReply::parse("   "),
            Err(NetconfError::MalformedReply(_))
        ));
    }
}
