use std::io::{self, IsTerminal, Read};
use thiserror::Error;
use tracing::trace;

#[derive(Debug, Error)]
pub enum BodyError {
    #[error("request body is required (use --body flag or pipe via stdin)")]
    Required,
    #[error("reading request body from stdin")]
    Stdin(#[source] io::Error),
}

/// Where a command's request body comes from.
pub trait BodySource {
    fn resolve(&mut self, flag: Option<&str>) -> Result<Option<Vec<u8>>, BodyError>;

    fn require(&mut self, flag: Option<&str>) -> Result<Vec<u8>, BodyError> {
        self.resolve(flag)?.ok_or(BodyError::Required)
    }
}

/// `--body` first, then piped stdin. An interactive terminal is never read.
pub struct ProcessStdin;

impl BodySource for ProcessStdin {
    fn resolve(&mut self, flag: Option<&str>) -> Result<Option<Vec<u8>>, BodyError> {
        let stdin = io::stdin();
        let interactive = stdin.is_terminal();
        resolve(flag, stdin.lock(), interactive)
    }
}

pub fn resolve<R: Read>(
    flag: Option<&str>,
    mut input: R,
    interactive: bool,
) -> Result<Option<Vec<u8>>, BodyError> {
    if let Some(body) = flag.filter(|b| !b.is_empty()) {
        trace!(bytes = body.len(), "body from --body");
        return Ok(Some(body.as_bytes().to_vec()));
    }
    if interactive {
        return Ok(None);
    }

    let mut data = Vec::new();
    input.read_to_end(&mut data).map_err(BodyError::Stdin)?;
    if data.is_empty() {
        return Ok(None);
    }
    trace!(bytes = data.len(), "body from stdin");
    Ok(Some(data))
}

#[cfg(test)]
pub(crate) struct FixedInput(pub Option<&'static str>);

#[cfg(test)]
impl BodySource for FixedInput {
    fn resolve(&mut self, flag: Option<&str>) -> Result<Option<Vec<u8>>, BodyError> {
        let piped = self.0.unwrap_or("");
        resolve(flag, piped.as_bytes(), self.0.is_none())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Broken;

    impl Read for Broken {
        fn read(&mut self, _: &mut [u8]) -> io::Result<usize> {
            Err(io::Error::other("pipe closed"))
        }
    }

    #[test]
    fn flag_wins_over_stdin() {
        let body = resolve(Some(r#"{"a":1}"#), &b"{\"b\":2}"[..], false).unwrap();
        assert_eq!(body.as_deref(), Some(&br#"{"a":1}"#[..]));
    }

    #[test]
    fn empty_flag_counts_as_absent() {
        let body = resolve(Some(""), &b"{\"b\":2}"[..], false).unwrap();
        assert_eq!(body.as_deref(), Some(&b"{\"b\":2}"[..]));
    }

    #[test]
    fn interactive_stdin_is_not_read() {
        assert_eq!(resolve(None, Broken, true).unwrap(), None);
    }

    #[test]
    fn empty_pipe_yields_nothing() {
        assert_eq!(resolve(None, &b""[..], false).unwrap(), None);
    }

    #[test]
    fn piped_body_is_kept_verbatim() {
        let body = resolve(None, &b"  {\"x\": true}\n"[..], false).unwrap();
        assert_eq!(body.as_deref(), Some(&b"  {\"x\": true}\n"[..]));
    }

    #[test]
    fn read_failure_is_reported() {
        let err = resolve(None, Broken, false).unwrap_err();
        assert!(matches!(err, BodyError::Stdin(_)));
    }

    #[test]
    fn require_rejects_missing_body() {
        let err = FixedInput(None).require(None).unwrap_err();
        assert!(matches!(err, BodyError::Required));
        assert_eq!(
            err.to_string(),
            "request body is required (use --body flag or pipe via stdin)"
        );
        assert_eq!(FixedInput(Some("{}")).require(None).unwrap(), b"{}");
    }
}
