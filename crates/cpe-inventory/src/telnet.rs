//! Thin prompt-driven telnet adapter for IOS-style command lines.
//!
//! Every option the server offers is refused, so the stream carries plain
//! text once negotiation bytes are filtered out. Login, `enable` and command
//! execution are driven by watching for the device prompt.

use async_trait::async_trait;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

use cpe_core::SessionError;

use crate::session::{Connector, Session, SessionParams};

const IAC: u8 = 255;
const DONT: u8 = 254;
const DO: u8 = 253;
const WONT: u8 = 252;
const WILL: u8 = 251;
const SB: u8 = 250;
const SE: u8 = 240;

const USERNAME_PROMPTS: &[&str] = &["Username:", "login:"];
const PASSWORD_PROMPT: &str = "Password:";

/// Opens [`TelnetSession`]s.
#[derive(Debug, Clone, Default)]
pub struct TelnetConnector;

#[async_trait]
impl Connector for TelnetConnector {
    type Session = TelnetSession;

    async fn open(&self, params: &SessionParams) -> Result<TelnetSession, SessionError> {
        let addr = (params.address, params.port);
        let stream = tokio::time::timeout(params.timeout, TcpStream::connect(addr))
            .await
            .map_err(|_| SessionError::Connect(format!("timed out after {:?}", params.timeout)))?
            .map_err(|e| SessionError::Connect(e.to_string()))?;

        let mut session = TelnetSession {
            stream,
            filter: NegotiationFilter::default(),
            pending: Vec::new(),
            prompt_base: String::new(),
        };
        session.login(&params.username, &params.password).await?;
        session.run("terminal length 0").await?;

        tracing::debug!(address = %params.address, prompt = %session.prompt_base, "Telnet login complete");
        Ok(session)
    }
}

/// A logged-in telnet session.
pub struct TelnetSession {
    stream: TcpStream,
    filter: NegotiationFilter,
    pending: Vec<u8>,
    /// Prompt text without its trailing `>` or `#`.
    prompt_base: String,
}

impl TelnetSession {
    async fn login(&mut self, username: &str, password: &str) -> Result<(), SessionError> {
        let mut text = self.read_until(|t| is_credential_prompt(t) || is_any_prompt(t)).await?;

        if ends_with_any(&text, USERNAME_PROMPTS) {
            self.send_line(username).await?;
            text = self.read_until(|t| ends_with_any(t, &[PASSWORD_PROMPT])).await?;
        }
        if ends_with_any(&text, &[PASSWORD_PROMPT]) {
            self.send_line(password).await?;
            text = self.read_until(|t| is_credential_prompt(t) || is_any_prompt(t)).await?;
        }
        if is_credential_prompt(&text) {
            return Err(SessionError::Login("credentials rejected".to_string()));
        }

        self.prompt_base = prompt_base(&text);
        Ok(())
    }

    async fn send_line(&mut self, line: &str) -> Result<(), SessionError> {
        self.stream.write_all(line.as_bytes()).await?;
        self.stream.write_all(b"\r\n").await?;
        Ok(())
    }

    /// Read until `done` accepts the text accumulated since the last call.
    async fn read_until<F>(&mut self, done: F) -> Result<String, SessionError>
    where
        F: Fn(&str) -> bool,
    {
        let mut chunk = [0u8; 4096];
        loop {
            let text = String::from_utf8_lossy(&self.pending).into_owned();
            if done(&text) {
                self.pending.clear();
                return Ok(text);
            }

            let n = self.stream.read(&mut chunk).await?;
            if n == 0 {
                return Err(SessionError::Closed);
            }
            let mut replies = Vec::new();
            self.filter.feed(&chunk[..n], &mut self.pending, &mut replies);
            if !replies.is_empty() {
                self.stream.write_all(&replies).await?;
            }
        }
    }
}

#[async_trait]
impl Session for TelnetSession {
    async fn enter_privileged(&mut self, secret: &str) -> Result<(), SessionError> {
        self.send_line("enable").await?;
        let text = self
            .read_until(|t| ends_with_any(t, &[PASSWORD_PROMPT]) || is_any_prompt(t))
            .await?;

        let text = if ends_with_any(&text, &[PASSWORD_PROMPT]) {
            self.send_line(secret).await?;
            self.read_until(|t| ends_with_any(t, &[PASSWORD_PROMPT]) || is_any_prompt(t))
                .await?
        } else {
            text
        };

        if last_line(&text).ends_with('#') {
            self.prompt_base = prompt_base(&text);
            Ok(())
        } else {
            Err(SessionError::Rejected("enable secret not accepted".to_string()))
        }
    }

    async fn run(&mut self, command: &str) -> Result<String, SessionError> {
        self.send_line(command).await?;
        let base = self.prompt_base.clone();
        let text = self.read_until(|t| at_own_prompt(&base, t)).await?;
        Ok(command_output(&text, command))
    }

    async fn close(&mut self) {
        let _ = self.send_line("exit").await;
        let _ = self.stream.shutdown().await;
    }
}

// ── Negotiation filter ────────────────────────────────────────────

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
enum FilterState {
    #[default]
    Data,
    Iac,
    Verb(u8),
    Sub,
    SubIac,
}

/// Strips telnet negotiation from a byte stream and refuses every option.
///
/// State carries across calls so sequences split between reads are handled.
#[derive(Debug, Default)]
struct NegotiationFilter {
    state: FilterState,
}

impl NegotiationFilter {
    fn feed(&mut self, input: &[u8], data: &mut Vec<u8>, replies: &mut Vec<u8>) {
        for &b in input {
            self.state = match (self.state, b) {
                (FilterState::Data, IAC) => FilterState::Iac,
                (FilterState::Data, b'\r' | 0) => FilterState::Data,
                (FilterState::Data, b) => {
                    data.push(b);
                    FilterState::Data
                }
                (FilterState::Iac, IAC) => {
                    data.push(IAC);
                    FilterState::Data
                }
                (FilterState::Iac, DO | DONT | WILL | WONT) => FilterState::Verb(b),
                (FilterState::Iac, SB) => FilterState::Sub,
                (FilterState::Iac, _) => FilterState::Data,
                (FilterState::Verb(verb), option) => {
                    match verb {
                        DO => replies.extend_from_slice(&[IAC, WONT, option]),
                        WILL => replies.extend_from_slice(&[IAC, DONT, option]),
                        _ => {}
                    }
                    FilterState::Data
                }
                (FilterState::Sub, IAC) => FilterState::SubIac,
                (FilterState::Sub, _) => FilterState::Sub,
                (FilterState::SubIac, SE) => FilterState::Data,
                (FilterState::SubIac, _) => FilterState::Sub,
            };
        }
    }
}

// ── Prompt helpers ────────────────────────────────────────────────

fn last_line(text: &str) -> &str {
    text.trim_end().rsplit('\n').next().unwrap_or_default().trim()
}

fn ends_with_any(text: &str, patterns: &[&str]) -> bool {
    let tail = text.trim_end();
    patterns.iter().any(|p| tail.ends_with(p))
}

fn is_credential_prompt(text: &str) -> bool {
    ends_with_any(text, USERNAME_PROMPTS) || ends_with_any(text, &[PASSWORD_PROMPT])
}

fn is_any_prompt(text: &str) -> bool {
    let line = last_line(text);
    line.len() > 1 && (line.ends_with('>') || line.ends_with('#'))
}

fn at_own_prompt(base: &str, text: &str) -> bool {
    is_any_prompt(text) && last_line(text).starts_with(base)
}

fn prompt_base(text: &str) -> String {
    let line = last_line(text);
    line.trim_end_matches(['>', '#']).to_string()
}

/// Drop the echoed command line and the trailing prompt.
fn command_output(text: &str, command: &str) -> String {
    let mut lines: Vec<&str> = text.lines().collect();
    lines.pop();
    if lines
        .first()
        .is_some_and(|first| first.trim_end().ends_with(command))
    {
        lines.remove(0);
    }
    lines.join("\n")
}
