//! Per-tab queue of in-page dialogs (alert / confirm / prompt).
//!
//! Requests arrive from the `promptHandler` content script. Only the head of
//! the queue is shown; answering it pops it and the next one becomes current.
//! Closing the tab cancels whatever is left.

use std::collections::VecDeque;
use tabkeep_scripting::PromptRequest;

/// How a queued dialog was answered
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PromptResponse {
    /// Alert dismissed
    Acknowledged,
    /// Confirm answered with OK (`true`) or Cancel (`false`)
    Confirmed(bool),
    /// Prompt submitted with text, or dismissed (`None`)
    Text(Option<String>),
    /// The tab went away before the user answered
    Cancelled,
}

/// Callback invoked once with the dialog's answer
pub type PromptResponder = Box<dyn FnOnce(PromptResponse) + Send>;

struct QueuedPrompt {
    request: PromptRequest,
    responder: Option<PromptResponder>,
}

/// FIFO of pending dialogs for one tab
#[derive(Default)]
pub struct PromptQueue {
    queue: VecDeque<QueuedPrompt>,
}

impl PromptQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enqueue(&mut self, request: PromptRequest, responder: Option<PromptResponder>) {
        self.queue.push_back(QueuedPrompt { request, responder });
    }

    /// The dialog that should be on screen, if any
    pub fn current(&self) -> Option<&PromptRequest> {
        self.queue.front().map(|p| &p.request)
    }

    /// Answer the current dialog. Returns false if nothing was queued.
    pub fn respond(&mut self, response: PromptResponse) -> bool {
        let Some(prompt) = self.queue.pop_front() else {
            return false;
        };
        if let Some(responder) = prompt.responder {
            responder(response);
        }
        true
    }

    /// Cancel every queued dialog, returning how many there were
    pub fn cancel_all(&mut self) -> usize {
        let count = self.queue.len();
        for prompt in self.queue.drain(..) {
            if let Some(responder) = prompt.responder {
                responder(PromptResponse::Cancelled);
            }
        }
        if count > 0 {
            log::debug!("Cancelled {} queued prompt(s)", count);
        }
        count
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}

impl std::fmt::Debug for PromptQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PromptQueue")
            .field("pending", &self.queue.len())
            .finish()
    }
}
