//! Scripted LLM service

use crate::error::{PipelineError, Result};
use crate::llm::{CompletionRequest, CompletionResponse, LlmService, TokenStream};
use crate::pipeline::PassName;
use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

/// Phrases that identify each pass's built-in system prompt
const PASS_MARKERS: &[(PassName, &str)] = &[
    (PassName::Research, "compact brief"),
    (PassName::Idea, "content strategist"),
    (PassName::Angle, "You choose framings"),
    (PassName::Outline, "You structure a"),
    (PassName::Draft, "You write the body"),
    (PassName::Enhance, "You polish an existing"),
    (PassName::Scoring, "You review a"),
];

/// Which pass a request was rendered for, judged by its system prompt
pub fn pass_for_request(request: &CompletionRequest) -> Option<PassName> {
    PASS_MARKERS
        .iter()
        .find(|(_, marker)| request.system_prompt.contains(marker))
        .map(|(pass, _)| *pass)
}

#[derive(Debug, Clone)]
enum Reply {
    Text(String),
    Fail(String),
}

#[derive(Debug, Clone)]
enum StreamReply {
    Tokens(Vec<String>),
    /// Tokens followed by a transport failure
    Broken(Vec<String>, String),
    Fail(String),
}

/// Builder for [`MockLlm`]
///
/// Replies are queued per pass; once a queue is down to its last reply that
/// reply is repeated for every further call.
#[derive(Default)]
pub struct MockLlmBuilder {
    completions: HashMap<PassName, Vec<Reply>>,
    streams: HashMap<PassName, Vec<StreamReply>>,
}

impl MockLlmBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn completion(mut self, pass: PassName, content: impl Into<String>) -> Self {
        self.completions
            .entry(pass)
            .or_default()
            .push(Reply::Text(content.into()));
        self
    }

    pub fn completion_error(mut self, pass: PassName, message: &str) -> Self {
        self.completions
            .entry(pass)
            .or_default()
            .push(Reply::Fail(message.to_string()));
        self
    }

    pub fn stream<S: Into<String>>(mut self, pass: PassName, tokens: Vec<S>) -> Self {
        self.streams
            .entry(pass)
            .or_default()
            .push(StreamReply::Tokens(tokens.into_iter().map(Into::into).collect()));
        self
    }

    pub fn broken_stream<S: Into<String>>(
        mut self,
        pass: PassName,
        tokens: Vec<S>,
        message: &str,
    ) -> Self {
        self.streams.entry(pass).or_default().push(StreamReply::Broken(
            tokens.into_iter().map(Into::into).collect(),
            message.to_string(),
        ));
        self
    }

    pub fn stream_error(mut self, pass: PassName, message: &str) -> Self {
        self.streams
            .entry(pass)
            .or_default()
            .push(StreamReply::Fail(message.to_string()));
        self
    }

    pub fn build(self) -> MockLlm {
        MockLlm {
            completions: self.completions,
            streams: self.streams,
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

/// LLM service answering from per-pass scripts
pub struct MockLlm {
    completions: HashMap<PassName, Vec<Reply>>,
    streams: HashMap<PassName, Vec<StreamReply>>,
    requests: Arc<Mutex<Vec<(PassName, CompletionRequest)>>>,
}

impl MockLlm {
    pub fn builder() -> MockLlmBuilder {
        MockLlmBuilder::new()
    }

    /// Number of requests made on behalf of a pass
    pub fn call_count(&self, pass: PassName) -> usize {
        self.lock_requests()
            .iter()
            .filter(|(p, _)| *p == pass)
            .count()
    }

    pub fn total_calls(&self) -> usize {
        self.lock_requests().len()
    }

    /// Requests made on behalf of a pass, oldest first
    pub fn requests_for(&self, pass: PassName) -> Vec<CompletionRequest> {
        self.lock_requests()
            .iter()
            .filter(|(p, _)| *p == pass)
            .map(|(_, r)| r.clone())
            .collect()
    }

    fn lock_requests(&self) -> std::sync::MutexGuard<'_, Vec<(PassName, CompletionRequest)>> {
        self.requests.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Record the request and return the pass plus its zero-based call index
    fn record(&self, request: &CompletionRequest) -> Result<(PassName, usize)> {
        let pass = pass_for_request(request).ok_or_else(|| {
            PipelineError::Llm("mock received a prompt it cannot attribute to a pass".to_string())
        })?;
        let mut requests = self.lock_requests();
        let index = requests.iter().filter(|(p, _)| *p == pass).count();
        requests.push((pass, request.clone()));
        Ok((pass, index))
    }
}

fn pick<T: Clone>(replies: Option<&Vec<T>>, index: usize) -> Option<T> {
    let replies = replies?;
    replies.get(index).or_else(|| replies.last()).cloned()
}

#[async_trait]
impl LlmService for MockLlm {
    async fn generate_completion(&self, request: CompletionRequest) -> Result<CompletionResponse> {
        let (pass, index) = self.record(&request)?;
        match pick(self.completions.get(&pass), index) {
            Some(Reply::Text(content)) => Ok(CompletionResponse { content }),
            Some(Reply::Fail(message)) => Err(PipelineError::Llm(message)),
            None => Err(PipelineError::Llm(format!(
                "no scripted completion for {pass} pass"
            ))),
        }
    }

    async fn generate_streaming_completion(
        &self,
        request: CompletionRequest,
    ) -> Result<TokenStream> {
        let (pass, index) = self.record(&request)?;
        match pick(self.streams.get(&pass), index) {
            Some(StreamReply::Tokens(tokens)) => {
                Ok(stream::iter(tokens.into_iter().map(Ok)).boxed())
            }
            Some(StreamReply::Broken(tokens, message)) => {
                let items = tokens
                    .into_iter()
                    .map(Ok)
                    .chain(std::iter::once(Err(PipelineError::Stream(message))));
                Ok(stream::iter(items).boxed())
            }
            Some(StreamReply::Fail(message)) => Err(PipelineError::Llm(message)),
            None => Err(PipelineError::Llm(format!(
                "no scripted stream for {pass} pass"
            ))),
        }
    }
}
