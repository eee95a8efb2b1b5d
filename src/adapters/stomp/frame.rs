//! STOMP 1.2 frame codec.
//!
//! ```text
//! COMMAND\n
//! header1:value1\n
//! header2:value2\n
//! \n
//! body^@
//! ```
//!
//! A WebSocket text message may carry several frames, and bare EOLs
//! between frames are heart-beats. Header values are escaped (`\\`, `\n`,
//! `\r`, `\c`) except on `CONNECT` and `CONNECTED`.

use std::fmt;
use std::str::FromStr;

use crate::domain::foundation::RealtimeError;

/// Client and server frame commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    Connect,
    Stomp,
    Connected,
    Send,
    Subscribe,
    Unsubscribe,
    Ack,
    Nack,
    Begin,
    Commit,
    Abort,
    Disconnect,
    Message,
    Receipt,
    Error,
}

impl Command {
    pub fn as_str(&self) -> &'static str {
        match self {
            Command::Connect => "CONNECT",
            Command::Stomp => "STOMP",
            Command::Connected => "CONNECTED",
            Command::Send => "SEND",
            Command::Subscribe => "SUBSCRIBE",
            Command::Unsubscribe => "UNSUBSCRIBE",
            Command::Ack => "ACK",
            Command::Nack => "NACK",
            Command::Begin => "BEGIN",
            Command::Commit => "COMMIT",
            Command::Abort => "ABORT",
            Command::Disconnect => "DISCONNECT",
            Command::Message => "MESSAGE",
            Command::Receipt => "RECEIPT",
            Command::Error => "ERROR",
        }
    }

    /// Header values of these frames are sent verbatim.
    fn escapes_headers(&self) -> bool {
        !matches!(self, Command::Connect | Command::Connected)
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Command {
    type Err = RealtimeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "CONNECT" => Command::Connect,
            "STOMP" => Command::Stomp,
            "CONNECTED" => Command::Connected,
            "SEND" => Command::Send,
            "SUBSCRIBE" => Command::Subscribe,
            "UNSUBSCRIBE" => Command::Unsubscribe,
            "ACK" => Command::Ack,
            "NACK" => Command::Nack,
            "BEGIN" => Command::Begin,
            "COMMIT" => Command::Commit,
            "ABORT" => Command::Abort,
            "DISCONNECT" => Command::Disconnect,
            "MESSAGE" => Command::Message,
            "RECEIPT" => Command::Receipt,
            "ERROR" => Command::Error,
            other => return Err(RealtimeError::parse(format!("unknown STOMP command '{}'", other))),
        })
    }
}

/// One STOMP frame. Header order is preserved; the first occurrence of a
/// repeated header wins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StompFrame {
    pub command: Command,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl StompFrame {
    pub fn new(command: Command) -> Self {
        Self {
            command,
            headers: Vec::new(),
            body: String::new(),
        }
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }

    /// Value of the first header named `name`.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Serializes the frame, adding `content-length` for non-empty bodies.
    pub fn encode(&self) -> String {
        let escape = self.command.escapes_headers();
        let mut out = String::with_capacity(64 + self.body.len());
        out.push_str(self.command.as_str());
        out.push('\n');
        for (name, value) in &self.headers {
            push_header_part(&mut out, name, escape);
            out.push(':');
            push_header_part(&mut out, value, escape);
            out.push('\n');
        }
        if !self.body.is_empty() && self.get("content-length").is_none() {
            out.push_str(&format!("content-length:{}\n", self.body.len()));
        }
        out.push('\n');
        out.push_str(&self.body);
        out.push('\0');
        out
    }

    /// Decodes every frame in `input`, skipping heart-beats.
    ///
    /// # Errors
    ///
    /// [`RealtimeError::Parse`] on an unknown command, a malformed header,
    /// a bad escape sequence, or a frame without its NUL terminator.
    pub fn decode_all(input: &str) -> Result<Vec<StompFrame>, RealtimeError> {
        let mut frames = Vec::new();
        let mut rest = input;
        while let Some((frame, remaining)) = decode_one(rest)? {
            frames.push(frame);
            rest = remaining;
        }
        Ok(frames)
    }
}

/// True when `input` only carries heart-beat EOLs.
pub fn is_heartbeat(input: &str) -> bool {
    !input.is_empty() && input.chars().all(|c| c == '\n' || c == '\r')
}

fn decode_one(input: &str) -> Result<Option<(StompFrame, &str)>, RealtimeError> {
    let input = input.trim_start_matches(['\r', '\n']);
    if input.is_empty() {
        return Ok(None);
    }

    let (command_line, mut rest) = split_line(input)
        .ok_or_else(|| RealtimeError::parse("truncated STOMP frame"))?;
    let command: Command = command_line.parse()?;
    let unescape_headers = command.escapes_headers();

    let mut headers = Vec::new();
    loop {
        let (line, remaining) =
            split_line(rest).ok_or_else(|| RealtimeError::parse("truncated STOMP headers"))?;
        rest = remaining;
        if line.is_empty() {
            break;
        }
        let (name, value) = line
            .split_once(':')
            .ok_or_else(|| RealtimeError::parse(format!("malformed header '{}'", line)))?;
        let (name, value) = if unescape_headers {
            (unescape(name)?, unescape(value)?)
        } else {
            (name.to_string(), value.to_string())
        };
        headers.push((name, value));
    }

    let content_length = headers
        .iter()
        .find(|(name, _)| name == "content-length")
        .map(|(_, value)| {
            value
                .trim()
                .parse::<usize>()
                .map_err(|_| RealtimeError::parse(format!("bad content-length '{}'", value)))
        })
        .transpose()?;

    let body_end = match content_length {
        Some(length) => {
            if rest.len() < length || !rest.is_char_boundary(length) {
                return Err(RealtimeError::parse("STOMP body shorter than content-length"));
            }
            if rest.as_bytes().get(length) != Some(&0) {
                return Err(RealtimeError::parse("STOMP frame missing NUL terminator"));
            }
            length
        }
        None => rest
            .find('\0')
            .ok_or_else(|| RealtimeError::parse("STOMP frame missing NUL terminator"))?,
    };

    let frame = StompFrame {
        command,
        headers,
        body: rest[..body_end].to_string(),
    };
    Ok(Some((frame, &rest[body_end + 1..])))
}

/// Splits off one line ending in `\n` (optionally `\r\n`).
fn split_line(input: &str) -> Option<(&str, &str)> {
    let newline = input.find('\n')?;
    let line = &input[..newline];
    Some((line.strip_suffix('\r').unwrap_or(line), &input[newline + 1..]))
}

fn push_header_part(out: &mut String, raw: &str, escape: bool) {
    if !escape {
        out.push_str(raw);
        return;
    }
    for c in raw.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            ':' => out.push_str("\\c"),
            other => out.push(other),
        }
    }
}

fn unescape(raw: &str) -> Result<String, RealtimeError> {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('\\') => out.push('\\'),
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('c') => out.push(':'),
            other => {
                return Err(RealtimeError::parse(format!(
                    "invalid header escape '\\{}'",
                    other.map(String::from).unwrap_or_default()
                )))
            }
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn encodes_connect_without_escaping() {
        let frame = StompFrame::new(Command::Connect)
            .header("accept-version", "1.2,1.1")
            .header("Authorization", "Bearer a:b");

        assert_eq!(
            frame.encode(),
            "CONNECT\naccept-version:1.2,1.1\nAuthorization:Bearer a:b\n\n\0"
        );
    }

    #[test]
    fn encodes_send_with_content_length() {
        let frame = StompFrame::new(Command::Send)
            .header("destination", "/app/chat/1")
            .with_body(r#"{"content":"hi"}"#);

        assert_eq!(
            frame.encode(),
            "SEND\ndestination:/app/chat/1\ncontent-length:16\n\n{\"content\":\"hi\"}\0"
        );
    }

    #[test]
    fn escapes_header_values_on_send() {
        let frame = StompFrame::new(Command::Send).header("x", "a:b\nc\\");
        assert!(frame.encode().contains("x:a\\cb\\nc\\\\\n"));
    }

    #[test]
    fn decodes_message_frame() {
        let raw = "MESSAGE\nsubscription:sub-0\ndestination:/topic/rooms/1\n\n{\"content\":\"hi\"}\0";

        let frames = StompFrame::decode_all(raw).unwrap();

        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].command, Command::Message);
        assert_eq!(frames[0].get("subscription"), Some("sub-0"));
        assert_eq!(frames[0].body, "{\"content\":\"hi\"}");
    }

    #[test]
    fn decodes_crlf_lines_and_heartbeats() {
        let raw = "\r\n\nCONNECTED\r\nversion:1.2\r\nheart-beat:20000,20000\r\n\r\n\0\n";

        let frames = StompFrame::decode_all(raw).unwrap();

        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].get("heart-beat"), Some("20000,20000"));
    }

    #[test]
    fn decodes_several_frames_in_one_message() {
        let raw = "RECEIPT\nreceipt-id:1\n\n\0MESSAGE\nsubscription:sub-1\n\nx\0";

        let frames = StompFrame::decode_all(raw).unwrap();

        assert_eq!(frames.len(), 2);
        assert_eq!(frames[1].body, "x");
    }

    #[test]
    fn content_length_allows_nul_in_body() {
        let raw = "MESSAGE\ncontent-length:3\n\na\0b\0";

        let frames = StompFrame::decode_all(raw).unwrap();

        assert_eq!(frames[0].body, "a\0b");
    }

    #[test]
    fn first_repeated_header_wins() {
        let raw = "MESSAGE\nfoo:1\nfoo:2\n\n\0";
        assert_eq!(StompFrame::decode_all(raw).unwrap()[0].get("foo"), Some("1"));
    }

    #[test]
    fn rejects_unterminated_frame() {
        assert!(StompFrame::decode_all("MESSAGE\n\nbody").is_err());
    }

    #[test]
    fn rejects_unknown_command() {
        assert!(StompFrame::decode_all("HELLO\n\n\0").is_err());
    }

    #[test]
    fn rejects_bad_escape() {
        assert!(StompFrame::decode_all("MESSAGE\nx:\\t\n\n\0").is_err());
    }

    #[test]
    fn heartbeat_detection() {
        assert!(is_heartbeat("\n"));
        assert!(is_heartbeat("\r\n"));
        assert!(!is_heartbeat(""));
        assert!(!is_heartbeat("MESSAGE\n"));
    }

    proptest! {
        #[test]
        fn escaped_header_values_survive_decoding(value in "[a-z:\\\\\r\n ]{0,24}") {
            let encoded = StompFrame::new(Command::Message).header("h", value.clone()).encode();
            let decoded = StompFrame::decode_all(&encoded).unwrap();
            prop_assert_eq!(decoded[0].get("h"), Some(value.as_str()));
        }
    }
}
