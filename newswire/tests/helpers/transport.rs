#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use newswire::{PushTransport, RenderedMessage, TransportError};

/// Transport whose outcomes are scripted per send. Once the script drains,
/// every further send succeeds. All send attempts are recorded.
#[derive(Default)]
pub struct ScriptedTransport {
    script: Mutex<VecDeque<Result<(), TransportError>>>,
    sent: Mutex<Vec<(String, RenderedMessage)>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue outcomes for the next sends, in order.
    pub fn with_script(outcomes: Vec<Result<(), TransportError>>) -> Self {
        Self {
            script: Mutex::new(outcomes.into()),
            sent: Mutex::new(Vec::new()),
        }
    }

    /// Every `(token, message)` pair handed to this transport so far.
    pub fn sent(&self) -> Vec<(String, RenderedMessage)> {
        self.sent.lock().unwrap().clone()
    }

    pub fn sent_titles(&self) -> Vec<String> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .map(|(_, m)| m.title.clone())
            .collect()
    }
}

#[async_trait]
impl PushTransport for ScriptedTransport {
    fn name(&self) -> &'static str {
        "scripted"
    }

    async fn send(
        &self,
        device_token: &str,
        message: &RenderedMessage,
    ) -> Result<(), TransportError> {
        self.sent
            .lock()
            .unwrap()
            .push((device_token.to_string(), message.clone()));
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Ok(()))
    }
}
