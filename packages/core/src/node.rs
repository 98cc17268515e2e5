//! The adapter contract shared by every operation node.
//!
//! An [`Operation`] knows how to validate a message, which single remote call
//! to make, and how to write the response back onto the message. [`Node`]
//! wraps an operation with its deployed connection and status indicator and
//! drives the fixed sequence:
//!
//! 1. refuse the input if the node has no usable connection;
//! 2. [`Operation::prepare`]: validate and resolve inputs, no I/O;
//! 3. [`Operation::call`]: exactly one remote call;
//! 4. [`Operation::complete`] on success, or attach a normalized error.
//!
//! Every input produces exactly one [`Outcome`].

use async_trait::async_trait;
use tracing::error;

use crate::connection::{ClientError, Connection};
use crate::error::{ErrorInfo, SetupError, ValidationError};
use crate::message::Message;
use crate::registry::NodeKind;
use crate::server::ServerRegistry;
use crate::status::Status;

// ---------------------------------------------------------------------------
// Outcome
// ---------------------------------------------------------------------------

/// The result of handling one input: which output the message leaves on.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// Output 0.
    Success(Message),
    /// Output 1. The message carries `error`.
    Failure(Message),
}

impl Outcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success(_))
    }

    /// Index of the output this outcome is routed to.
    pub fn output(&self) -> usize {
        match self {
            Outcome::Success(_) => 0,
            Outcome::Failure(_) => 1,
        }
    }

    pub fn message(&self) -> &Message {
        match self {
            Outcome::Success(m) | Outcome::Failure(m) => m,
        }
    }

    pub fn into_message(self) -> Message {
        match self {
            Outcome::Success(m) | Outcome::Failure(m) => m,
        }
    }

    /// The host's two-slot send form: `[Some(msg), None]` or `[None, Some(msg)]`.
    pub fn into_outputs(self) -> [Option<Message>; 2] {
        match self {
            Outcome::Success(m) => [Some(m), None],
            Outcome::Failure(m) => [None, Some(m)],
        }
    }
}

// ---------------------------------------------------------------------------
// Operation
// ---------------------------------------------------------------------------

/// One remote document-store operation.
#[async_trait]
pub trait Operation: Send + Sync {
    /// Inputs resolved from node config and message, ready for the call.
    type Request: Send + Sync;
    /// What the remote call returns on success.
    type Response: Send;

    fn kind(&self) -> NodeKind;

    /// Id of the referenced server node.
    fn server(&self) -> Option<&str>;

    /// Validate `msg` and resolve every input the call needs.
    fn prepare(&self, msg: &Message) -> Result<Self::Request, ValidationError>;

    /// Status shown while the call is in flight.
    fn busy(&self, request: &Self::Request) -> Status;

    /// Perform the single remote call.
    async fn call(
        &self,
        conn: &Connection,
        request: &Self::Request,
    ) -> Result<Self::Response, ClientError>;

    /// Write the response onto `msg`; returns the success status.
    fn complete(&self, msg: &mut Message, request: Self::Request, response: Self::Response)
        -> Status;

    /// Prefix for the failure log line, e.g. `"Insert failed"`.
    fn failure_label(&self) -> &'static str;
}

// ---------------------------------------------------------------------------
// Node
// ---------------------------------------------------------------------------

/// A deployed adapter: an [`Operation`], its connection, and its status.
#[derive(Debug)]
pub struct Node<O> {
    id: String,
    op: O,
    link: Result<Connection, SetupError>,
    status: Option<Status>,
}

impl<O: Operation> Node<O> {
    /// Resolve the operation's server reference and connect.
    ///
    /// A node whose server cannot be resolved is still created, but refuses
    /// every input with a configuration error.
    pub fn deploy(id: impl Into<String>, op: O, servers: &ServerRegistry) -> Self {
        let id = id.into();
        let link = servers.resolve(op.server()).and_then(|config| config.connect());
        if let Err(ref e) = link {
            error!(node = %id, kind = %op.kind(), "{e}");
        }
        Self {
            id,
            op,
            link,
            status: None,
        }
    }

    /// Deploy against an already-built connection.
    pub fn with_connection(id: impl Into<String>, op: O, conn: Connection) -> Self {
        Self {
            id: id.into(),
            op,
            link: Ok(conn),
            status: None,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn kind(&self) -> NodeKind {
        self.op.kind()
    }

    pub fn operation(&self) -> &O {
        &self.op
    }

    /// `false` when the node was deployed without a usable connection.
    pub fn is_ready(&self) -> bool {
        self.link.is_ok()
    }

    /// The current status indicator; `None` when cleared.
    pub fn status(&self) -> Option<&Status> {
        self.status.as_ref()
    }

    /// Handle one input message.
    pub async fn receive(&mut self, mut msg: Message) -> Outcome {
        let conn = match self.link {
            Ok(ref conn) => conn,
            Err(ref e) => {
                error!(node = %self.id, kind = %self.op.kind(), "{e}");
                self.status = Some(Status::failure("not configured"));
                msg.set("error", ErrorInfo::from(e).to_value());
                return Outcome::Failure(msg);
            }
        };

        let request = match self.op.prepare(&msg) {
            Ok(request) => request,
            Err(e) => {
                error!(node = %self.id, kind = %self.op.kind(), "{e}");
                self.status = Some(e.status());
                msg.set("error", ErrorInfo::from(&e).to_value());
                return Outcome::Failure(msg);
            }
        };

        self.status = Some(self.op.busy(&request));

        match self.op.call(conn, &request).await {
            Ok(response) => {
                msg.remove("error");
                self.status = Some(self.op.complete(&mut msg, request, response));
                Outcome::Success(msg)
            }
            Err(e) => {
                error!(
                    node = %self.id,
                    kind = %self.op.kind(),
                    "{}: {e}",
                    self.op.failure_label()
                );
                self.status = Some(Status::failure("failed"));
                msg.set("error", ErrorInfo::from(&e).to_value());
                Outcome::Failure(msg)
            }
        }
    }

    /// Shut the node down: clears the status indicator.
    pub fn close(&mut self) {
        self.status = None;
    }
}
