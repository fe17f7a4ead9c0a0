//! Transport abstraction for the real WebDriver implementation.
//!
//! The SDK never speaks the WebDriver wire protocol itself. Callers hand it
//! a [`Transport`] that executes commands against the browser or device the
//! Agent prepared, and every command flows through it:
//! - the intercepted user command itself
//! - non-reported side-channel queries (redaction checks, failure screenshots)
//!
//! [`ScriptedTransport`] is an in-memory implementation for tests and dry runs.

use std::sync::{Arc, Mutex};

use crate::command::{Command, Response};

/// Result type for transport operations
pub type TransportResult<T> = Result<T, TransportError>;

/// Errors raised by the real driver implementation
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The driver did not answer in time
    #[error("Transport timed out: {0}")]
    Timeout(String),

    /// The driver could not be reached
    #[error("Transport connection failed: {0}")]
    Connection(String),

    /// The driver answered with something unusable
    #[error("Transport protocol error: {0}")]
    Protocol(String),
}

/// Trait for the black-box WebDriver implementation
///
/// Implementations may mutate the command's parameters in place; callers
/// that need the original parameters must copy them first.
pub trait Transport: Send {
    /// Execute a command and return the driver's response
    fn execute(&mut self, command: &mut Command) -> TransportResult<Response>;
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn execute(&mut self, command: &mut Command) -> TransportResult<Response> {
        (**self).execute(command)
    }
}

type Handler = Box<dyn FnMut(&Command) -> TransportResult<Response> + Send>;

/// A transport that answers from a closure and records every command it sees
///
/// The command log is shared, so it stays readable after the transport has
/// been moved into a driver.
pub struct ScriptedTransport {
    handler: Handler,
    log: Arc<Mutex<Vec<Command>>>,
}

impl ScriptedTransport {
    /// Create a transport answering every command with `handler`
    pub fn new<F>(handler: F) -> Self
    where
        F: FnMut(&Command) -> TransportResult<Response> + Send + 'static,
    {
        Self {
            handler: Box::new(handler),
            log: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Create a transport that answers every command with an empty success
    pub fn succeeding() -> Self {
        Self::new(|_| Ok(Response::success(None)))
    }

    /// Shared handle on the commands received so far
    pub fn log(&self) -> Arc<Mutex<Vec<Command>>> {
        Arc::clone(&self.log)
    }
}

impl Transport for ScriptedTransport {
    fn execute(&mut self, command: &mut Command) -> TransportResult<Response> {
        if let Ok(mut log) = self.log.lock() {
            log.push(command.clone());
        }
        (self.handler)(command)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::{Status, names};

    #[test]
    fn test_scripted_transport_records_commands() {
        let mut transport = ScriptedTransport::succeeding();
        let log = transport.log();

        let mut command = Command::new(names::FIND_ELEMENT).param("value", "#a");
        let response = transport.execute(&mut command).unwrap();

        assert!(response.passed());
        assert_eq!(log.lock().unwrap().len(), 1);
        assert_eq!(log.lock().unwrap()[0].name, names::FIND_ELEMENT);
    }

    #[test]
    fn test_scripted_transport_handler_errors() {
        let mut transport = ScriptedTransport::new(|command| {
            if command.is_find_element() {
                Err(TransportError::Timeout("slow".into()))
            } else {
                Ok(Response::failure(Status::UnknownError, "nope"))
            }
        });

        let mut find = Command::new(names::FIND_ELEMENT);
        assert!(matches!(
            transport.execute(&mut find),
            Err(TransportError::Timeout(_))
        ));

        let mut other = Command::new(names::SCREENSHOT);
        assert!(!transport.execute(&mut other).unwrap().passed());
    }
}
