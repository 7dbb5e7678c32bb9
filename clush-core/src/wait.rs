//! Completion signals for commands whose effect finishes after the handler returns.
//!
//! A handler that kicks off an external operation creates a channel with
//! [`completion_channel`], moves the [`CompletionHandle`] into the job and
//! returns the [`CompletionSignal`] inside its [`Outcome`](crate::Outcome).
//! Dispatch awaits the signal when the command waits; otherwise the signal is
//! dropped and the job runs detached. No timeout is imposed here.

use tokio::sync::oneshot;

use crate::error::CommandError;

/// Fired by the external operation when it is done.
#[derive(Debug)]
pub struct CompletionHandle(oneshot::Sender<Result<(), String>>);

/// Awaited by dispatch for waiting commands.
#[derive(Debug)]
pub struct CompletionSignal(oneshot::Receiver<Result<(), String>>);

/// Create a connected handle/signal pair.
pub fn completion_channel() -> (CompletionHandle, CompletionSignal) {
    let (tx, rx) = oneshot::channel();
    (CompletionHandle(tx), CompletionSignal(rx))
}

impl CompletionHandle {
    /// Signal successful completion.
    pub fn complete(self) {
        // Nobody waiting is fine: the command was not synchronous.
        let _ = self.0.send(Ok(()));
    }

    /// Signal that the operation finished unsuccessfully.
    pub fn fail(self, message: impl Into<String>) {
        let _ = self.0.send(Err(message.into()));
    }
}

impl CompletionSignal {
    /// Wait until the handle fires. A handle dropped without firing counts as
    /// an incomplete operation.
    pub async fn wait(self) -> Result<(), CommandError> {
        match self.0.await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(message)) => Err(CommandError::Incomplete { message }),
            Err(_) => Err(CommandError::Incomplete {
                message: "operation was abandoned before completing".into(),
            }),
        }
    }

    /// A signal that has already fired.
    pub fn ready() -> Self {
        let (handle, signal) = completion_channel();
        handle.complete();
        signal
    }
}
