//! Chat completion access behind a local model seam.
//!
//! Mirrors the embedding seam: production wraps a rig provider agent,
//! tests script a [`MockChatModel`] so prompt contracts can be asserted
//! without any network traffic.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use rig::completion::{Chat, Message};
use rig::prelude::*;
use rig::providers::openai;

use crate::config::Settings;
use crate::memory::Turn;
use crate::types::AssistError;

/// A chat-completion model: system instructions, prior turns, one user turn.
#[async_trait]
pub trait ChatModel: Send + Sync {
    async fn chat(
        &self,
        preamble: &str,
        history: &[Turn],
        input: &str,
    ) -> Result<String, AssistError>;
}

/// OpenAI-backed implementation via rig.
pub struct RigChatModel {
    client: openai::Client,
    model: String,
    temperature: f64,
    max_tokens: u64,
}

impl RigChatModel {
    pub fn new(client: openai::Client, model: impl Into<String>, temperature: f64, max_tokens: u64) -> Self {
        Self {
            client,
            model: model.into(),
            temperature,
            max_tokens,
        }
    }

    pub fn from_settings(settings: &Settings) -> Result<Self, AssistError> {
        let api_key = settings
            .openai_api_key
            .as_deref()
            .ok_or_else(|| AssistError::Config("OPENAI_API_KEY is not set".to_string()))?;
        Ok(Self::new(
            openai::Client::new(api_key).map_err(|err| AssistError::Config(err.to_string()))?,
            settings.chat_model.clone(),
            settings.temperature,
            settings.max_output_tokens,
        ))
    }
}

#[async_trait]
impl ChatModel for RigChatModel {
    async fn chat(
        &self,
        preamble: &str,
        history: &[Turn],
        input: &str,
    ) -> Result<String, AssistError> {
        let agent = self
            .client
            .agent(&self.model)
            .preamble(preamble)
            .temperature(self.temperature)
            .max_tokens(self.max_tokens)
            .build();

        let mut messages = Vec::with_capacity(history.len() * 2);
        for turn in history {
            messages.push(Message::user(turn.input.clone()));
            messages.push(Message::assistant(turn.answer.clone()));
        }

        agent
            .chat(Message::user(input.to_string()), messages)
            .await
            .map_err(|err| AssistError::Completion(err.to_string()))
    }
}

/// A call recorded by [`MockChatModel`], for asserting prompt contracts.
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub preamble: String,
    pub input: String,
    pub history_len: usize,
}

/// Scripted chat model: pops one canned response per call and records what
/// it was asked. Running out of responses is an error, which doubles as an
/// assertion that a step was not supposed to reach the model.
#[derive(Debug, Default)]
pub struct MockChatModel {
    responses: Mutex<VecDeque<String>>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl MockChatModel {
    pub fn new<I, S>(responses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            responses: Mutex::new(responses.into_iter().map(Into::into).collect()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().expect("mock call log poisoned").clone()
    }
}

#[async_trait]
impl ChatModel for MockChatModel {
    async fn chat(
        &self,
        preamble: &str,
        history: &[Turn],
        input: &str,
    ) -> Result<String, AssistError> {
        self.calls.lock().expect("mock call log poisoned").push(RecordedCall {
            preamble: preamble.to_string(),
            input: input.to_string(),
            history_len: history.len(),
        });
        self.responses
            .lock()
            .expect("mock response queue poisoned")
            .pop_front()
            .ok_or_else(|| AssistError::Completion("mock model has no response queued".to_string()))
    }
}
